//! Date utilities for the learner's study day.

use super::error::DbError;
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Timelike};

/// Map a local timestamp to the learner's study day.
///
/// If the hour is before `daily_reset_hour`, the timestamp still belongs to
/// the previous study day, so late-night reviews count towards the day they
/// started on.
pub fn study_day<Tz: TimeZone>(now: DateTime<Tz>, daily_reset_hour: u32) -> NaiveDate {
    if now.hour() < daily_reset_hour {
        (now - Duration::days(1)).date_naive()
    } else {
        now.date_naive()
    }
}

/// Study day for the current local time.
pub fn local_study_day(daily_reset_hour: u32) -> NaiveDate {
    study_day(Local::now(), daily_reset_hour)
}

/// Store a date as its day number counted from 0001-01-01 (day 1).
///
/// Day numbers order the same way as dates over chrono's whole range, so SQL
/// can compare them directly.
pub fn to_day_number(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce())
}

/// Read back a stored day number.
pub fn from_day_number(value: i64) -> Result<NaiveDate, DbError> {
    i32::try_from(value)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| DbError::InvalidData(format!("day number {value} out of range")))
}
