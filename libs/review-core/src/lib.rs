//! Spaced repetition scheduling core shared by the study service and its tools.
//!
//! Provides:
//! - Review state types (ReviewState, EaseFactor, Quality)
//! - The SM-2 quality-graded interval algorithm
//! - Engine error types

pub mod algorithm;
pub mod error;
pub mod types;

pub use algorithm::sm2::{advance, Sm2};
pub use error::{Result, ScheduleError};
pub use types::{EaseFactor, Quality, ReviewState};
