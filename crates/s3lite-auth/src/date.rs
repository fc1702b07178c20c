//! `Date` header formatting.
//!
//! The signature covers the exact `Date` string, so it must be reproduced
//! byte-for-byte:
//!
//! ```text
//! Mon, 02 Jan 2006 15:04:05 +0900
//! ```
//!
//! Weekday and month names are the fixed English abbreviations regardless of
//! the process locale, and the zone is a numeric `±HHMM` offset, never `GMT`.

use chrono::{DateTime, TimeZone};

const REQUEST_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Format an instant for the `Date` header in its own offset.
#[must_use]
pub fn format_request_date<Tz>(instant: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    instant.format(REQUEST_DATE_FORMAT).to_string()
}
