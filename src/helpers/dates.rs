use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::ApiError;

/// Calendar date at `now` in the reference timezone, daylight saving included.
pub fn day_at(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

pub fn today(tz: Tz) -> NaiveDate {
    day_at(Utc::now(), tz)
}

/// Accepts only `YYYY-MM-DD`.
pub fn parse_day(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request(format!("Invalid day '{}', expected YYYY-MM-DD", raw)))
}
