//! Error handling for the study service.

use crate::db::DbError;
use review_core::ScheduleError;
use thiserror::Error;
use uuid::Uuid;

/// Study service error types
#[derive(Debug, Error)]
pub enum StudyError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("card {card_id} is not available to learner {learner_id}")]
    UnknownCard { learner_id: i64, card_id: i64 },

    #[error("deck {deck_id} is not available to learner {learner_id}")]
    UnknownDeck { learner_id: i64, deck_id: i64 },

    #[error("event {event_id} was already applied to a different grading")]
    EventReused { event_id: Uuid },

    #[error("grading failed after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: DbError,
    },

    #[error("database error")]
    Db(#[from] DbError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StudyError {
    /// Request-validation failures: the caller sent something that can never succeed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Schedule(ScheduleError::InvalidGrade(_)) | Self::EventReused { .. }
        )
    }
}

/// Result type alias for study operations
pub type Result<T> = std::result::Result<T, StudyError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    /// Every message in the source chain, outermost first.
    fn chain(error: &dyn std::error::Error) -> Vec<String> {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(source) = current {
            messages.push(source.to_string());
            current = source.source();
        }
        messages
    }

    #[test]
    fn test_invalid_grade_is_validation() {
        let error = StudyError::from(ScheduleError::InvalidGrade(9));
        assert!(error.is_validation());
        assert_eq!(
            error.to_string(),
            "invalid quality grade 9: expected a value between 0 and 5"
        );
    }

    #[test]
    fn test_unknown_card_is_not_validation() {
        let error = StudyError::UnknownCard {
            learner_id: 3,
            card_id: 12,
        };
        assert!(!error.is_validation());
        assert_eq!(error.to_string(), "card 12 is not available to learner 3");
    }

    #[test]
    fn test_retries_exhausted_display() {
        let error = StudyError::RetriesExhausted {
            attempts: 3,
            last: DbError::Busy,
        };
        assert_eq!(
            chain(&error),
            vec!["grading failed after 3 attempts", "database is busy"]
        );
    }

    #[test]
    fn test_db_error_display() {
        let error = StudyError::from(DbError::InvalidData("bad date".to_string()));
        assert_eq!(
            chain(&error),
            vec!["database error", "invalid data: bad date"]
        );
    }
}
