//! Classroom study service: progress storage and grading sessions around
//! the `review-core` scheduling engine.

pub mod config;
pub mod db;
pub mod error;
pub mod session;

pub use config::Config;
pub use error::{Result, StudyError};
pub use session::{GradeOutcome, GradingEvent, SessionRunner, StudyQueue};
