//! Grading against a shared file database from several connections.

mod common;

use std::thread;
use std::time::Duration;

use classroom_study::db::{ProgressRepository, SqliteRepository};
use classroom_study::StudyError;
use common::{date, event, file_runner, seed};
use tempfile::TempDir;

fn seeded_file() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("progress.db");
    let repo = SqliteRepository::open(&path, Duration::from_secs(5)).unwrap();
    seed(&repo);
    (dir, path)
}

#[test]
fn different_cards_grade_independently() {
    let (_dir, path) = seeded_file();

    // Connections are opened up front; each thread owns one.
    let runners: Vec<_> = [100, 101, 102]
        .into_iter()
        .map(|card| (card, file_runner(&path, Duration::from_secs(5), 3)))
        .collect();

    let handles: Vec<_> = runners
        .into_iter()
        .map(|(card, mut runner)| {
            thread::spawn(move || {
                let mut today = date(2024, 1, 1);
                for _ in 0..3 {
                    let outcome = runner.grade(&event(1, card, 5, today)).unwrap();
                    today = outcome.state.next_review_date.unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let repo = SqliteRepository::open(&path, Duration::from_secs(5)).unwrap();
    for card in [100, 101, 102] {
        let state = repo.get_review_state(1, card).unwrap().unwrap();
        assert_eq!(state.repetitions, 3);
        assert_eq!(state.interval_days, 16);
    }
}

#[test]
fn same_card_grades_are_serialized() {
    let (_dir, path) = seeded_file();

    let runners: Vec<_> = (0..4)
        .map(|_| file_runner(&path, Duration::from_secs(5), 5))
        .collect();

    let handles: Vec<_> = runners
        .into_iter()
        .map(|mut runner| {
            thread::spawn(move || {
                runner.grade(&event(1, 100, 4, date(2024, 1, 1))).unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Every grade saw the previous one's result; none were lost.
    let repo = SqliteRepository::open(&path, Duration::from_secs(5)).unwrap();
    let state = repo.get_review_state(1, 100).unwrap().unwrap();
    assert_eq!(state.repetitions, 4);
}

#[test]
fn locked_database_exhausts_retries_without_writing() {
    let (_dir, path) = seeded_file();

    let mut holder = SqliteRepository::open(&path, Duration::from_secs(5)).unwrap();
    let mut runner = file_runner(&path, Duration::ZERO, 3);

    let lock = holder.begin().unwrap();
    let err = runner
        .grade(&event(1, 100, 5, date(2024, 1, 1)))
        .unwrap_err();
    assert!(matches!(err, StudyError::RetriesExhausted { attempts: 3, .. }));
    drop(lock);

    assert_eq!(runner.repository().get_review_state(1, 100).unwrap(), None);

    // Once the lock is gone the same grade goes through.
    let outcome = runner.grade(&event(1, 100, 5, date(2024, 1, 1))).unwrap();
    assert_eq!(outcome.state.interval_days, 1);
}
