//! Runtime configuration loaded from the environment (and `.env`).

use crate::error::{Result, StudyError};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Study service settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    /// Hour (0-23) at which a learner's study day rolls over.
    pub daily_reset_hour: u32,
    pub busy_timeout: Duration,
    /// Read-advance-write attempts per grading event before giving up.
    pub max_grade_attempts: u32,
    pub new_cards_per_session: usize,
    pub reviews_per_session: usize,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            daily_reset_hour: 0,
            busy_timeout: Duration::from_millis(5_000),
            max_grade_attempts: 3,
            new_cards_per_session: 20,
            reviews_per_session: 200,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from process environment after reading `.env` if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup. Unset variables keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let daily_reset_hour =
            parse_var(&lookup, "STUDY_DAILY_RESET_HOUR", defaults.daily_reset_hour)?;
        if daily_reset_hour > 23 {
            return Err(StudyError::Config(format!(
                "STUDY_DAILY_RESET_HOUR must be between 0 and 23, got {daily_reset_hour}"
            )));
        }

        let max_grade_attempts =
            parse_var(&lookup, "STUDY_MAX_GRADE_ATTEMPTS", defaults.max_grade_attempts)?;
        if max_grade_attempts == 0 {
            return Err(StudyError::Config(
                "STUDY_MAX_GRADE_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let busy_timeout_ms = parse_var(
            &lookup,
            "STUDY_BUSY_TIMEOUT_MS",
            defaults.busy_timeout.as_millis() as u64,
        )?;

        Ok(Self {
            database_path: lookup("STUDY_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            daily_reset_hour,
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            max_grade_attempts,
            new_cards_per_session: parse_var(
                &lookup,
                "STUDY_NEW_CARDS_PER_SESSION",
                defaults.new_cards_per_session,
            )?,
            reviews_per_session: parse_var(
                &lookup,
                "STUDY_REVIEWS_PER_SESSION",
                defaults.reviews_per_session,
            )?,
            log_filter: lookup("RUST_LOG").unwrap_or(defaults.log_filter),
        })
    }
}

fn default_database_path() -> PathBuf {
    // Use the local data directory, falling back to the current dir
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("classroom-study")
        .join("progress.db")
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|err| StudyError::Config(format!("{key}={raw:?}: {err}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.database_path.ends_with("classroom-study/progress.db"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("STUDY_DATABASE_PATH", "/tmp/progress.db"),
            ("STUDY_DAILY_RESET_HOUR", "4"),
            ("STUDY_BUSY_TIMEOUT_MS", "250"),
            ("STUDY_MAX_GRADE_ATTEMPTS", "5"),
            ("STUDY_NEW_CARDS_PER_SESSION", "10"),
            ("STUDY_REVIEWS_PER_SESSION", " 50 "),
            ("RUST_LOG", "classroom_study=debug"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/progress.db"));
        assert_eq!(config.daily_reset_hour, 4);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.max_grade_attempts, 5);
        assert_eq!(config.new_cards_per_session, 10);
        assert_eq!(config.reviews_per_session, 50);
        assert_eq!(config.log_filter, "classroom_study=debug");
    }

    #[test]
    fn test_reset_hour_out_of_range() {
        let result = Config::from_lookup(lookup_from(&[("STUDY_DAILY_RESET_HOUR", "24")]));
        assert!(matches!(result, Err(StudyError::Config(_))));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let result = Config::from_lookup(lookup_from(&[("STUDY_MAX_GRADE_ATTEMPTS", "0")]));
        assert!(matches!(result, Err(StudyError::Config(_))));
    }

    #[test]
    fn test_unparsable_value_names_the_variable() {
        let err = Config::from_lookup(lookup_from(&[("STUDY_BUSY_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("STUDY_BUSY_TIMEOUT_MS"));
    }
}
