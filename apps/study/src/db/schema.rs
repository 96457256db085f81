//! SQLite schema definitions.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Per-connection settings applied before the schema.
pub const PRAGMAS: &str = r#"
PRAGMA foreign_keys = ON;
"#;

/// Complete schema for the progress database.
pub const SCHEMA: &str = r#"
-- Learners (mirrored from the account system)
CREATE TABLE IF NOT EXISTS learners (
    id INTEGER PRIMARY KEY
);

-- Decks and their sharing rules (mirrored from deck management)
CREATE TABLE IF NOT EXISTS decks (
    id INTEGER PRIMARY KEY,
    owner_id INTEGER NOT NULL REFERENCES learners(id) ON DELETE CASCADE,
    visibility TEXT NOT NULL DEFAULT 'private' CHECK (visibility IN ('private', 'class')),
    class_id INTEGER
);

-- Cards (content lives elsewhere; only ownership is needed here)
CREATE TABLE IF NOT EXISTS cards (
    id INTEGER PRIMARY KEY,
    deck_id INTEGER NOT NULL REFERENCES decks(id) ON DELETE CASCADE
);

-- Class enrolment
CREATE TABLE IF NOT EXISTS class_members (
    class_id INTEGER NOT NULL,
    student_id INTEGER NOT NULL REFERENCES learners(id) ON DELETE CASCADE,
    PRIMARY KEY (class_id, student_id)
);

-- Scheduling state per (learner, card); dates are day numbers from 0001-01-01
CREATE TABLE IF NOT EXISTS card_progress (
    learner_id INTEGER NOT NULL REFERENCES learners(id) ON DELETE CASCADE,
    card_id INTEGER NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
    repetitions INTEGER NOT NULL DEFAULT 0 CHECK (repetitions >= 0),
    interval_days INTEGER NOT NULL DEFAULT 0 CHECK (interval_days >= 0),
    ease_hundredths INTEGER NOT NULL DEFAULT 250 CHECK (ease_hundredths >= 130),
    next_review_date INTEGER,
    version INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (learner_id, card_id)
);

-- Applied grading events
CREATE TABLE IF NOT EXISTS review_log (
    event_id TEXT PRIMARY KEY,
    learner_id INTEGER NOT NULL,
    card_id INTEGER NOT NULL,
    quality INTEGER NOT NULL,
    reviewed_on INTEGER NOT NULL,
    repetitions_before INTEGER NOT NULL,
    interval_before INTEGER NOT NULL,
    ease_before INTEGER NOT NULL,
    next_review_before INTEGER,
    repetitions_after INTEGER NOT NULL,
    interval_after INTEGER NOT NULL,
    ease_after INTEGER NOT NULL,
    next_review_after INTEGER NOT NULL,
    FOREIGN KEY (learner_id, card_id)
        REFERENCES card_progress(learner_id, card_id) ON DELETE CASCADE
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_cards_deck ON cards(deck_id);
CREATE INDEX IF NOT EXISTS idx_progress_due ON card_progress(learner_id, next_review_date);
CREATE INDEX IF NOT EXISTS idx_review_log_card ON review_log(learner_id, card_id);
"#;
