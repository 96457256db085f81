//! Repository pattern for progress storage.

use crate::db::date_utils::{from_day_number, to_day_number};
use crate::db::error::DbError;
use chrono::NaiveDate;
use review_core::{EaseFactor, ReviewState};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

type Result<T> = std::result::Result<T, DbError>;

/// Learner may study a card's deck when they own it, or when the deck is
/// shared with a class they are enrolled in. `?1` is the learner id.
const DECK_ACCESS: &str = "(d.owner_id = ?1 OR (d.visibility = 'class' AND d.class_id IS NOT NULL
    AND EXISTS (SELECT 1 FROM class_members m
                WHERE m.class_id = d.class_id AND m.student_id = ?1)))";

const PROGRESS_COLUMNS: &str =
    "repetitions, interval_days, ease_hundredths, next_review_date, version";

/// Deck sharing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Class,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Class => "class",
        }
    }
}

/// Stored review state with its optimistic-lock version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredProgress {
    pub state: ReviewState,
    pub version: i64,
}

/// Card whose review date has arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DueCard {
    pub card_id: i64,
    pub state: ReviewState,
}

/// One applied grading event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewLogEntry {
    pub event_id: Uuid,
    pub learner_id: i64,
    pub card_id: i64,
    pub quality: u8,
    pub reviewed_on: NaiveDate,
    pub before: ReviewState,
    pub after: ReviewState,
}

/// Repository for the ownership data mirrored from deck and class management.
pub trait RosterRepository {
    fn add_learner(&self, learner_id: i64) -> Result<()>;
    fn add_deck(
        &self,
        deck_id: i64,
        owner_id: i64,
        visibility: Visibility,
        class_id: Option<i64>,
    ) -> Result<()>;
    fn add_card(&self, card_id: i64, deck_id: i64) -> Result<()>;
    fn enroll(&self, class_id: i64, learner_id: i64) -> Result<()>;
    fn remove_card(&self, card_id: i64) -> Result<()>;
    fn remove_learner(&self, learner_id: i64) -> Result<()>;
    fn deck_accessible(&self, learner_id: i64, deck_id: i64) -> Result<bool>;
}

/// Read-side queries over card progress.
pub trait ProgressRepository {
    fn get_review_state(&self, learner_id: i64, card_id: i64) -> Result<Option<ReviewState>>;
    fn count_due(&self, learner_id: i64, today: NaiveDate) -> Result<usize>;
    fn due_cards(
        &self,
        learner_id: i64,
        deck_id: i64,
        today: NaiveDate,
        limit: usize,
    ) -> Result<Vec<DueCard>>;
    fn new_cards(&self, learner_id: i64, deck_id: i64, limit: usize) -> Result<Vec<i64>>;
}

/// SQLite implementation of repositories.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open database at path, creating if necessary.
    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(super::schema::PRAGMAS)?;
        self.conn.execute_batch(super::schema::SCHEMA)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            params![super::schema::SCHEMA_VERSION],
        )?;
        Ok(())
    }

    /// Start a read-advance-write unit for grading.
    ///
    /// The transaction takes the write lock up front, so two units for the
    /// same row can never interleave their read and write.
    pub fn begin(&mut self) -> Result<ProgressTx<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(ProgressTx { tx })
    }
}

impl RosterRepository for SqliteRepository {
    fn add_learner(&self, learner_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO learners (id) VALUES (?1)",
            params![learner_id],
        )?;
        Ok(())
    }

    fn add_deck(
        &self,
        deck_id: i64,
        owner_id: i64,
        visibility: Visibility,
        class_id: Option<i64>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO decks (id, owner_id, visibility, class_id) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                owner_id = excluded.owner_id,
                visibility = excluded.visibility,
                class_id = excluded.class_id",
            params![deck_id, owner_id, visibility.as_str(), class_id],
        )?;
        Ok(())
    }

    fn add_card(&self, card_id: i64, deck_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO cards (id, deck_id) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET deck_id = excluded.deck_id",
            params![card_id, deck_id],
        )?;
        Ok(())
    }

    fn enroll(&self, class_id: i64, learner_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO class_members (class_id, student_id) VALUES (?1, ?2)",
            params![class_id, learner_id],
        )?;
        Ok(())
    }

    fn remove_card(&self, card_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM cards WHERE id = ?1", params![card_id])?;
        Ok(())
    }

    fn remove_learner(&self, learner_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM learners WHERE id = ?1", params![learner_id])?;
        Ok(())
    }

    fn deck_accessible(&self, learner_id: i64, deck_id: i64) -> Result<bool> {
        let sql =
            format!("SELECT EXISTS (SELECT 1 FROM decks d WHERE d.id = ?2 AND {DECK_ACCESS})");
        self.conn
            .query_row(&sql, params![learner_id, deck_id], |row| row.get(0))
            .map_err(Into::into)
    }
}

impl ProgressRepository for SqliteRepository {
    fn get_review_state(&self, learner_id: i64, card_id: i64) -> Result<Option<ReviewState>> {
        Ok(load_progress(&self.conn, learner_id, card_id)?.map(|stored| stored.state))
    }

    fn count_due(&self, learner_id: i64, today: NaiveDate) -> Result<usize> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM card_progress
                 WHERE learner_id = ?1 AND next_review_date IS NOT NULL AND next_review_date <= ?2",
                params![learner_id, to_day_number(today)],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    fn due_cards(
        &self,
        learner_id: i64,
        deck_id: i64,
        today: NaiveDate,
        limit: usize,
    ) -> Result<Vec<DueCard>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.card_id, p.repetitions, p.interval_days, p.ease_hundredths,
                    p.next_review_date, p.version
             FROM card_progress p
             JOIN cards c ON c.id = p.card_id
             WHERE p.learner_id = ?1 AND c.deck_id = ?2
               AND p.next_review_date IS NOT NULL AND p.next_review_date <= ?3
             ORDER BY p.next_review_date, p.card_id
             LIMIT ?4",
        )?;

        let rows = stmt
            .query_map(
                params![learner_id, deck_id, to_day_number(today), limit],
                |row| Ok((row.get::<_, i64>(0)?, RawProgress::from_row(row, 1)?)),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(card_id, raw)| -> Result<DueCard> {
                Ok(DueCard {
                    card_id,
                    state: raw.into_stored()?.state,
                })
            })
            .collect()
    }

    fn new_cards(&self, learner_id: i64, deck_id: i64, limit: usize) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id FROM cards c
             LEFT JOIN card_progress p ON p.card_id = c.id AND p.learner_id = ?1
             WHERE c.deck_id = ?2 AND p.card_id IS NULL
             ORDER BY c.id
             LIMIT ?3",
        )?;
        let ids = stmt
            .query_map(params![learner_id, deck_id, limit], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(ids)
    }
}

/// Explicit unit of work for one grading: ownership check, read, write and log.
///
/// Dropping it without calling [`ProgressTx::commit`] rolls everything back.
pub struct ProgressTx<'conn> {
    tx: Transaction<'conn>,
}

impl ProgressTx<'_> {
    pub fn card_accessible(&self, learner_id: i64, card_id: i64) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM cards c JOIN decks d ON d.id = c.deck_id
             WHERE c.id = ?2 AND {DECK_ACCESS})"
        );
        self.tx
            .query_row(&sql, params![learner_id, card_id], |row| row.get(0))
            .map_err(Into::into)
    }

    pub fn load(&self, learner_id: i64, card_id: i64) -> Result<Option<StoredProgress>> {
        load_progress(&self.tx, learner_id, card_id)
    }

    /// Write `state`, checking that the row is still at `expected_version`
    /// (`None` means no row may exist yet). Returns the new version.
    pub fn store(
        &self,
        learner_id: i64,
        card_id: i64,
        state: &ReviewState,
        expected_version: Option<i64>,
    ) -> Result<i64> {
        let next_date = state.next_review_date.map(to_day_number);
        let (affected, version) = match expected_version {
            None => {
                let affected = self.tx.execute(
                    "INSERT INTO card_progress
                        (learner_id, card_id, repetitions, interval_days, ease_hundredths,
                         next_review_date, version)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
                     ON CONFLICT(learner_id, card_id) DO NOTHING",
                    params![
                        learner_id,
                        card_id,
                        state.repetitions,
                        state.interval_days,
                        state.ease_factor.hundredths(),
                        next_date
                    ],
                )?;
                (affected, 1)
            }
            Some(expected) => {
                let affected = self.tx.execute(
                    "UPDATE card_progress
                     SET repetitions = ?3, interval_days = ?4, ease_hundredths = ?5,
                         next_review_date = ?6, version = version + 1
                     WHERE learner_id = ?1 AND card_id = ?2 AND version = ?7",
                    params![
                        learner_id,
                        card_id,
                        state.repetitions,
                        state.interval_days,
                        state.ease_factor.hundredths(),
                        next_date,
                        expected
                    ],
                )?;
                (affected, expected + 1)
            }
        };

        if affected == 0 {
            tracing::debug!(
                learner_id,
                card_id,
                ?expected_version,
                "progress version check failed"
            );
            return Err(DbError::Conflict {
                learner_id,
                card_id,
            });
        }
        Ok(version)
    }

    pub fn logged_event(&self, event_id: Uuid) -> Result<Option<ReviewLogEntry>> {
        let raw = self
            .tx
            .query_row(
                "SELECT learner_id, card_id, quality, reviewed_on,
                        repetitions_before, interval_before, ease_before, next_review_before,
                        repetitions_after, interval_after, ease_after, next_review_after
                 FROM review_log WHERE event_id = ?1",
                params![event_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, u8>(2)?,
                        row.get::<_, i64>(3)?,
                        RawProgress::from_log_row(row, 4)?,
                        RawProgress::from_log_row(row, 8)?,
                    ))
                },
            )
            .optional()?;

        raw.map(
            |(learner_id, card_id, quality, reviewed_on, before, after)| -> Result<ReviewLogEntry> {
                Ok(ReviewLogEntry {
                    event_id,
                    learner_id,
                    card_id,
                    quality,
                    reviewed_on: from_day_number(reviewed_on)?,
                    before: before.into_stored()?.state,
                    after: after.into_stored()?.state,
                })
            },
        )
        .transpose()
    }

    pub fn log_review(&self, entry: &ReviewLogEntry) -> Result<()> {
        let after_date = entry.after.next_review_date.ok_or_else(|| {
            DbError::InvalidData("graded state has no next review date".to_string())
        })?;
        self.tx.execute(
            "INSERT INTO review_log
                (event_id, learner_id, card_id, quality, reviewed_on,
                 repetitions_before, interval_before, ease_before, next_review_before,
                 repetitions_after, interval_after, ease_after, next_review_after)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                entry.event_id.to_string(),
                entry.learner_id,
                entry.card_id,
                entry.quality,
                to_day_number(entry.reviewed_on),
                entry.before.repetitions,
                entry.before.interval_days,
                entry.before.ease_factor.hundredths(),
                entry.before.next_review_date.map(to_day_number),
                entry.after.repetitions,
                entry.after.interval_days,
                entry.after.ease_factor.hundredths(),
                to_day_number(after_date),
            ],
        )?;
        Ok(())
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit().map_err(Into::into)
    }
}

fn load_progress(
    conn: &Connection,
    learner_id: i64,
    card_id: i64,
) -> Result<Option<StoredProgress>> {
    let sql = format!(
        "SELECT {PROGRESS_COLUMNS} FROM card_progress WHERE learner_id = ?1 AND card_id = ?2"
    );
    conn.query_row(&sql, params![learner_id, card_id], |row| {
        RawProgress::from_row(row, 0)
    })
    .optional()?
    .map(RawProgress::into_stored)
    .transpose()
}

/// Progress columns as stored, before validation.
struct RawProgress {
    repetitions: i64,
    interval_days: i64,
    ease_hundredths: i64,
    next_review_date: Option<i64>,
    version: i64,
}

impl RawProgress {
    fn from_row(row: &rusqlite::Row, start: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            repetitions: row.get(start)?,
            interval_days: row.get(start + 1)?,
            ease_hundredths: row.get(start + 2)?,
            next_review_date: row.get(start + 3)?,
            version: row.get(start + 4)?,
        })
    }

    /// Log rows carry the same four state columns but no version.
    fn from_log_row(row: &rusqlite::Row, start: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            repetitions: row.get(start)?,
            interval_days: row.get(start + 1)?,
            ease_hundredths: row.get(start + 2)?,
            next_review_date: row.get(start + 3)?,
            version: 0,
        })
    }

    fn into_stored(self) -> Result<StoredProgress> {
        let repetitions = u32::try_from(self.repetitions)
            .map_err(|_| DbError::InvalidData(format!("repetitions {}", self.repetitions)))?;
        let interval_days = u32::try_from(self.interval_days)
            .map_err(|_| DbError::InvalidData(format!("interval_days {}", self.interval_days)))?;
        let ease_factor = u32::try_from(self.ease_hundredths)
            .ok()
            .and_then(EaseFactor::from_hundredths)
            .ok_or_else(|| {
                DbError::InvalidData(format!("ease_hundredths {}", self.ease_hundredths))
            })?;
        let next_review_date = self.next_review_date.map(from_day_number).transpose()?;

        Ok(StoredProgress {
            state: ReviewState {
                repetitions,
                interval_days,
                ease_factor,
                next_review_date,
            },
            version: self.version,
        })
    }
}
