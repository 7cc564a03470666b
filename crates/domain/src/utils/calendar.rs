//! Business calendar
//!
//! Timesheets are keyed by the local calendar date in the organization's
//! timezone, not by UTC date. A lesson starting at 23:30 UTC belongs to the
//! next day in Tokyo.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Converts instants into business-local calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessCalendar {
    tz: Tz,
}

impl BusinessCalendar {
    #[must_use]
    pub const fn new(tz: Tz) -> Self {
        Self { tz }
    }

    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.tz
    }

    /// Local calendar date of `instant`, i.e. the instant normalized to
    /// local midnight.
    #[must_use]
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// Business "today" for an explicit reference time.
    #[must_use]
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.date_of(now)
    }
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self::new(chrono_tz::Asia::Tokyo)
    }
}
