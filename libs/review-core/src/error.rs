//! Error types for review-core.

use crate::types::EaseFactor;
use thiserror::Error;

/// Result type alias using ScheduleError.
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Errors that can occur while scheduling a review.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid quality grade {0}: expected a value between 0 and 5")]
    InvalidGrade(i64),

    #[error("interval of {interval_days} days scaled by ease {ease} exceeds the supported range")]
    IntervalOverflow { interval_days: u32, ease: EaseFactor },

    #[error("next review date {interval_days} days after {today} is out of range")]
    DateOutOfRange {
        today: chrono::NaiveDate,
        interval_days: u32,
    },
}
