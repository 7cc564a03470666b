//! Macro for implementing string conversions on status enums
//!
//! Status enums are stored as text columns and carried in messages, so each
//! one needs the same `as_str`/`Display`/`FromStr` trio. Parsing is
//! case-insensitive and failures are reported as
//! [`TimesheetError::InvalidArgument`](crate::errors::TimesheetError).
//!
//! # Example
//!
//! ```rust
//! use timesheet_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum ReviewStatus {
//!     Open,
//!     Closed,
//! }
//!
//! impl_domain_status_conversions!(ReviewStatus {
//!     Open => "REVIEW_STATUS_OPEN",
//!     Closed => "REVIEW_STATUS_CLOSED",
//! });
//!
//! assert_eq!("review_status_open".parse::<ReviewStatus>().unwrap(), ReviewStatus::Open);
//! ```

/// Implements `as_str`, `Display` and `FromStr` for status enums
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their canonical string
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical string form used in storage and messages.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = $crate::errors::TimesheetError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err($crate::errors::TimesheetError::InvalidArgument(format!(
                    "invalid {}: {}",
                    stringify!($enum_name),
                    s
                )))
            }
        }
    };
}
