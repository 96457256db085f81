//! Core types for review scheduling.

use crate::error::{Result, ScheduleError};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Ease factor stored as fixed-point hundredths.
///
/// Every SM-2 ease adjustment is a whole number of hundredths, so keeping the
/// value as an integer makes repeated updates exact on every platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EaseFactor(u32);

impl EaseFactor {
    /// Ease assigned to a card that has never been graded.
    pub const INITIAL: Self = Self(250);
    /// Floor applied after every update.
    pub const MINIMUM: Self = Self(130);

    /// Create from hundredths (`250` is 2.50). Returns `None` below the floor.
    pub fn from_hundredths(hundredths: u32) -> Option<Self> {
        (hundredths >= Self::MINIMUM.0).then_some(Self(hundredths))
    }

    /// Create from a decimal value, rounded to the nearest hundredth.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let hundredths = (value * 100.0).round();
        if hundredths > u32::MAX as f64 {
            return None;
        }
        Self::from_hundredths(hundredths as u32)
    }

    pub fn hundredths(self) -> u32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Apply a signed adjustment in hundredths, clamping at the floor.
    /// There is no ceiling.
    pub fn adjusted(self, delta_hundredths: i32) -> Self {
        let raw = i64::from(self.0) + i64::from(delta_hundredths);
        let clamped = raw.clamp(i64::from(Self::MINIMUM.0), i64::from(u32::MAX));
        Self(clamped as u32)
    }
}

impl Default for EaseFactor {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for EaseFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for EaseFactor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for EaseFactor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Self::from_f64(value).ok_or_else(|| {
            serde::de::Error::custom(format!("ease factor {value} is below the 1.3 minimum"))
        })
    }
}

/// Learner self-assessment of recall for one review (0-5).
///
/// - 0: complete blackout
/// - 1: incorrect, answer remembered on reveal
/// - 2: incorrect, answer seemed easy on reveal
/// - 3: correct with serious difficulty
/// - 4: correct after hesitation
/// - 5: perfect recall
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Quality(u8);

impl Quality {
    pub const MAX: u8 = 5;
    /// Lowest grade that counts as a successful recall.
    pub const PASSING: u8 = 3;

    /// Validate a raw grade. Out-of-range values are rejected, never clamped.
    pub fn new(value: i64) -> Result<Self> {
        match u8::try_from(value) {
            Ok(grade) if grade <= Self::MAX => Ok(Self(grade)),
            _ => Err(ScheduleError::InvalidGrade(value)),
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// A grade below the passing threshold resets the repetition streak.
    pub fn is_lapse(self) -> bool {
        self.0 < Self::PASSING
    }
}

impl TryFrom<i64> for Quality {
    type Error = ScheduleError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Quality {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = i64::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

/// Scheduling state for one (learner, card) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewState {
    pub repetitions: u32,
    pub interval_days: u32,
    pub ease_factor: EaseFactor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_review_date: Option<NaiveDate>,
}

impl Default for ReviewState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewState {
    /// State of a card that has never been graded.
    pub const fn new() -> Self {
        Self {
            repetitions: 0,
            interval_days: 0,
            ease_factor: EaseFactor::INITIAL,
            next_review_date: None,
        }
    }

    /// True until the first grading assigns a review date.
    pub fn is_new(&self) -> bool {
        self.next_review_date.is_none()
    }

    /// Due when the review date has arrived or passed (inclusive of `today`).
    pub fn is_due(&self, today: NaiveDate) -> bool {
        matches!(self.next_review_date, Some(date) if date <= today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn new_state_matches_never_reviewed_card() {
        let state = ReviewState::default();
        assert_eq!(state.repetitions, 0);
        assert_eq!(state.interval_days, 0);
        assert_eq!(state.ease_factor.hundredths(), 250);
        assert!(state.is_new());
    }

    #[test]
    fn due_is_inclusive_of_today() {
        let state = ReviewState {
            next_review_date: Some(date(2024, 3, 10)),
            ..ReviewState::new()
        };
        assert!(!state.is_due(date(2024, 3, 9)));
        assert!(state.is_due(date(2024, 3, 10)));
        assert!(state.is_due(date(2024, 3, 11)));
    }

    #[test]
    fn new_card_is_never_due() {
        assert!(!ReviewState::new().is_due(date(2099, 1, 1)));
    }

    #[test]
    fn quality_accepts_closed_range() {
        for grade in 0..=5 {
            assert_eq!(Quality::new(grade).unwrap().value() as i64, grade);
        }
    }

    #[test]
    fn quality_rejects_out_of_range() {
        assert_eq!(Quality::new(-1), Err(ScheduleError::InvalidGrade(-1)));
        assert_eq!(Quality::new(6), Err(ScheduleError::InvalidGrade(6)));
        assert_eq!(
            Quality::try_from(i64::MAX),
            Err(ScheduleError::InvalidGrade(i64::MAX))
        );
    }

    #[test]
    fn three_is_the_lowest_passing_grade() {
        assert!(Quality::new(2).unwrap().is_lapse());
        assert!(!Quality::new(3).unwrap().is_lapse());
    }

    #[test]
    fn ease_rejects_values_below_floor() {
        assert!(EaseFactor::from_hundredths(129).is_none());
        assert_eq!(EaseFactor::from_hundredths(130), Some(EaseFactor::MINIMUM));
        assert!(EaseFactor::from_f64(1.2).is_none());
        assert!(EaseFactor::from_f64(f64::NAN).is_none());
    }

    #[test]
    fn ease_adjustment_clamps_at_floor_only() {
        assert_eq!(EaseFactor::MINIMUM.adjusted(-80), EaseFactor::MINIMUM);
        assert_eq!(EaseFactor::INITIAL.adjusted(-14).hundredths(), 236);
        assert_eq!(
            EaseFactor::from_hundredths(1_000).unwrap().adjusted(10).hundredths(),
            1_010
        );
    }

    #[test]
    fn ease_display_keeps_two_decimals() {
        assert_eq!(EaseFactor::INITIAL.to_string(), "2.50");
        assert_eq!(EaseFactor::from_hundredths(226).unwrap().to_string(), "2.26");
        assert_eq!(EaseFactor::from_hundredths(1_305).unwrap().to_string(), "13.05");
    }

    #[test]
    fn state_serializes_ease_as_decimal() {
        let state = ReviewState {
            repetitions: 2,
            interval_days: 6,
            ease_factor: EaseFactor::from_hundredths(260).unwrap(),
            next_review_date: Some(date(2024, 1, 8)),
        };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["ease_factor"], serde_json::json!(2.6));
        assert_eq!(json["next_review_date"], "2024-01-08");

        let back: ReviewState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn deserialize_rejects_ease_below_floor() {
        let json = r#"{"repetitions":0,"interval_days":0,"ease_factor":1.1}"#;
        assert!(serde_json::from_str::<ReviewState>(json).is_err());
    }

    #[test]
    fn deserialize_rejects_out_of_range_quality() {
        assert!(serde_json::from_str::<Quality>("7").is_err());
        assert_eq!(serde_json::from_str::<Quality>("4").unwrap().value(), 4);
    }
}
