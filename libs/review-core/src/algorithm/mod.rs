//! Spaced repetition scheduling.
//!
//! Only the quality-graded SM-2 variant is supported.

pub mod sm2;
