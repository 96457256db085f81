//! Database error types.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error")]
    Sqlite(#[source] rusqlite::Error),

    #[error("database is busy")]
    Busy,

    #[error("progress for learner {learner_id} card {card_id} changed concurrently")]
    Conflict { learner_id: i64, card_id: i64 },

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl DbError {
    /// Whether the whole read-advance-write unit may be retried from a fresh read.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy | Self::Conflict { .. })
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => Self::Busy,
            _ => Self::Sqlite(err),
        }
    }
}
