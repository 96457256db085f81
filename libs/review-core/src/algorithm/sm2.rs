//! SM-2 spaced repetition algorithm.
//!
//! Based on SuperMemo 2 with the standard fixed interval table:
//! a lapse (grade below 3) schedules the card for the next day and resets the
//! streak, the first two successes schedule 1 and 6 days out, and later
//! successes scale the previous interval by the previous ease factor.

use crate::error::{Result, ScheduleError};
use crate::types::{EaseFactor, Quality, ReviewState};
use chrono::{Days, NaiveDate};

/// SM-2 scheduler with the fixed interval table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sm2;

/// Grade a card with the default SM-2 table.
///
/// `quality` is validated before anything else; an out-of-range grade fails
/// with [`ScheduleError::InvalidGrade`] and produces no new state.
pub fn advance(state: ReviewState, quality: i64, today: NaiveDate) -> Result<ReviewState> {
    let quality = Quality::new(quality)?;
    Sm2.advance(state, quality, today)
}

impl Sm2 {
    const LAPSE_INTERVAL: u32 = 1;
    const FIRST_INTERVAL: u32 = 1;
    const SECOND_INTERVAL: u32 = 6;

    /// Calculate the state that follows a review graded `quality` on `today`.
    pub fn advance(
        &self,
        state: ReviewState,
        quality: Quality,
        today: NaiveDate,
    ) -> Result<ReviewState> {
        let (repetitions, interval_days) = if quality.is_lapse() {
            (0, Self::LAPSE_INTERVAL)
        } else {
            let interval = match state.repetitions {
                0 => Self::FIRST_INTERVAL,
                1 => Self::SECOND_INTERVAL,
                // Scaled by the ease in effect before this review.
                _ => scale_interval(state.interval_days, state.ease_factor)?,
            };
            (state.repetitions.saturating_add(1), interval)
        };

        let ease_factor = state.ease_factor.adjusted(ease_delta(quality));

        let next_review_date = today
            .checked_add_days(Days::new(u64::from(interval_days)))
            .ok_or(ScheduleError::DateOutOfRange {
                today,
                interval_days,
            })?;

        Ok(ReviewState {
            repetitions,
            interval_days,
            ease_factor,
            next_review_date: Some(next_review_date),
        })
    }
}

/// `EF' - EF = 0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)`, in hundredths.
fn ease_delta(quality: Quality) -> i32 {
    let miss = i32::from(Quality::MAX - quality.value());
    10 - miss * (8 + miss * 2)
}

/// `round(interval * ease)`, nearest integer with ties away from zero.
fn scale_interval(interval_days: u32, ease: EaseFactor) -> Result<u32> {
    let product = u64::from(interval_days) * u64::from(ease.hundredths());
    u32::try_from((product + 50) / 100).map_err(|_| ScheduleError::IntervalOverflow {
        interval_days,
        ease,
    })
}
