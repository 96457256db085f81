//! Common test utilities and fixtures for integration tests.
//!
//! Roster used throughout:
//! - learner 1 owns private deck 10 (cards 100, 101, 102)
//! - learner 2 owns deck 20 shared with class 7 (cards 200, 201)
//! - learner 3 is enrolled in class 7
//! - learner 4 has no decks and no classes

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use classroom_study::db::{RosterRepository, SqliteRepository, Visibility};
use classroom_study::{Config, GradingEvent, SessionRunner};
use uuid::Uuid;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn test_config() -> Config {
    Config {
        database_path: "unused.db".into(),
        busy_timeout: Duration::from_secs(5),
        new_cards_per_session: 2,
        reviews_per_session: 10,
        ..Config::default()
    }
}

pub fn seed(repo: &SqliteRepository) {
    for learner in 1..=4 {
        repo.add_learner(learner).unwrap();
    }
    repo.add_deck(10, 1, Visibility::Private, None).unwrap();
    for card in [100, 101, 102] {
        repo.add_card(card, 10).unwrap();
    }
    repo.add_deck(20, 2, Visibility::Class, Some(7)).unwrap();
    for card in [200, 201] {
        repo.add_card(card, 20).unwrap();
    }
    repo.enroll(7, 3).unwrap();
}

/// Runner over a seeded in-memory database.
pub fn runner() -> SessionRunner {
    let repo = SqliteRepository::open_in_memory().unwrap();
    seed(&repo);
    SessionRunner::new(repo, &test_config())
}

/// Runner over a file database; the first caller should seed it.
pub fn file_runner(path: &Path, busy_timeout: Duration, max_attempts: u32) -> SessionRunner {
    let repo = SqliteRepository::open(path, busy_timeout).unwrap();
    let config = Config {
        max_grade_attempts: max_attempts,
        busy_timeout,
        ..test_config()
    };
    SessionRunner::new(repo, &config)
}

pub fn event(learner_id: i64, card_id: i64, quality: i64, occurred_on: NaiveDate) -> GradingEvent {
    GradingEvent {
        event_id: Some(Uuid::new_v4()),
        learner_id,
        card_id,
        quality,
        occurred_on,
    }
}
