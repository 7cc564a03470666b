//! Column codecs shared by the SQLite repositories.
//!
//! Calendar dates are stored as `YYYY-MM-DD` text and instants as unix
//! seconds. Decoding failures surface as `FromSqlConversionFailure` so they
//! flow through the regular rusqlite error mapping.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::Error as SqlError;
use timesheet_domain::TimesheetError;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn encode_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn decode_date(column: usize, value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|err| SqlError::FromSqlConversionFailure(column, Type::Text, Box::new(err)))
}

pub(crate) fn decode_instant(column: usize, seconds: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
        SqlError::FromSqlConversionFailure(
            column,
            Type::Integer,
            format!("timestamp {seconds} out of range").into(),
        )
    })
}

/// Decode a text column through the status enum's `FromStr`.
pub(crate) fn decode_enum<T>(column: usize, value: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = TimesheetError>,
{
    value.parse().map_err(|err: TimesheetError| {
        SqlError::FromSqlConversionFailure(column, Type::Text, Box::new(err))
    })
}

pub(crate) const fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

/// `?, ?, ?` for an `IN (...)` list of `count` values.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
