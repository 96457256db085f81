//! Session runner: study queues and grading.
//!
//! Grading runs as one unit per (learner, card): check ownership, read the
//! current state, advance it, write it back with a version check, and append
//! to the review log. A conflict or a busy database restarts the whole unit
//! from a fresh read; a state computed in a failed attempt is never reused.

use crate::config::Config;
use crate::db::{
    DueCard, ProgressRepository, ReviewLogEntry, RosterRepository, SqliteRepository,
};
use crate::error::{Result, StudyError};
use chrono::NaiveDate;
use review_core::{Quality, ReviewState, Sm2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Grade submitted by a learner for one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingEvent {
    /// Client-chosen id; resubmitting the same id does not grade twice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
    pub learner_id: i64,
    pub card_id: i64,
    pub quality: i64,
    /// The learner's calendar day the review happened on.
    pub occurred_on: NaiveDate,
}

/// Result of applying a grading event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeOutcome {
    pub event_id: Uuid,
    pub learner_id: i64,
    pub card_id: i64,
    pub previous: ReviewState,
    pub state: ReviewState,
    /// True when the event had already been applied and nothing changed.
    pub duplicate: bool,
}

/// Study queue containing cards to study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudyQueue {
    pub review_cards: Vec<DueCard>,
    pub new_cards: Vec<i64>,
    pub review_remaining: usize,
    pub new_remaining: usize,
}

pub struct SessionRunner {
    repo: SqliteRepository,
    engine: Sm2,
    max_attempts: u32,
    new_cards_per_session: usize,
    reviews_per_session: usize,
}

impl SessionRunner {
    pub fn new(repo: SqliteRepository, config: &Config) -> Self {
        Self {
            repo,
            engine: Sm2,
            max_attempts: config.max_grade_attempts.max(1),
            new_cards_per_session: config.new_cards_per_session,
            reviews_per_session: config.reviews_per_session,
        }
    }

    pub fn repository(&self) -> &SqliteRepository {
        &self.repo
    }

    /// Apply one grading event.
    ///
    /// The grade is validated before storage is touched, so an invalid grade
    /// leaves no trace regardless of the card or learner.
    pub fn grade(&mut self, event: &GradingEvent) -> Result<GradeOutcome> {
        let quality = Quality::new(event.quality)?;
        let event_id = event.event_id.unwrap_or_else(Uuid::new_v4);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.grade_once(event, quality, event_id) {
                Err(StudyError::Db(err)) if err.is_retryable() => {
                    if attempt >= self.max_attempts {
                        tracing::warn!(
                            learner_id = event.learner_id,
                            card_id = event.card_id,
                            attempt,
                            error = %err,
                            "giving up on grading event"
                        );
                        return Err(StudyError::RetriesExhausted {
                            attempts: attempt,
                            last: err,
                        });
                    }
                    tracing::warn!(
                        learner_id = event.learner_id,
                        card_id = event.card_id,
                        attempt,
                        error = %err,
                        "retrying grading from a fresh read"
                    );
                }
                other => return other,
            }
        }
    }

    fn grade_once(
        &mut self,
        event: &GradingEvent,
        quality: Quality,
        event_id: Uuid,
    ) -> Result<GradeOutcome> {
        let tx = self.repo.begin()?;

        if !tx.card_accessible(event.learner_id, event.card_id)? {
            return Err(StudyError::UnknownCard {
                learner_id: event.learner_id,
                card_id: event.card_id,
            });
        }

        if let Some(entry) = tx.logged_event(event_id)? {
            let same_grading = entry.learner_id == event.learner_id
                && entry.card_id == event.card_id
                && entry.quality == quality.value()
                && entry.reviewed_on == event.occurred_on;
            if !same_grading {
                return Err(StudyError::EventReused { event_id });
            }
            tracing::debug!(%event_id, card_id = event.card_id, "grading event already applied");
            return Ok(GradeOutcome {
                event_id,
                learner_id: entry.learner_id,
                card_id: entry.card_id,
                previous: entry.before,
                state: entry.after,
                duplicate: true,
            });
        }

        let stored = tx.load(event.learner_id, event.card_id)?;
        let previous = stored.map(|p| p.state).unwrap_or_default();
        let state = self.engine.advance(previous, quality, event.occurred_on)?;

        tx.store(
            event.learner_id,
            event.card_id,
            &state,
            stored.map(|p| p.version),
        )?;
        tx.log_review(&ReviewLogEntry {
            event_id,
            learner_id: event.learner_id,
            card_id: event.card_id,
            quality: quality.value(),
            reviewed_on: event.occurred_on,
            before: previous,
            after: state,
        })?;
        tx.commit()?;

        tracing::info!(
            learner_id = event.learner_id,
            card_id = event.card_id,
            quality = quality.value(),
            interval_days = state.interval_days,
            ease_factor = %state.ease_factor,
            next_review_date = ?state.next_review_date,
            "applied grade"
        );

        Ok(GradeOutcome {
            event_id,
            learner_id: event.learner_id,
            card_id: event.card_id,
            previous,
            state,
            duplicate: false,
        })
    }

    /// Cards to study in a deck today: due reviews first, then unseen cards.
    pub fn queue(&self, learner_id: i64, deck_id: i64, today: NaiveDate) -> Result<StudyQueue> {
        if !self.repo.deck_accessible(learner_id, deck_id)? {
            return Err(StudyError::UnknownDeck {
                learner_id,
                deck_id,
            });
        }

        let review_cards = self
            .repo
            .due_cards(learner_id, deck_id, today, self.reviews_per_session)?;
        let new_cards = self
            .repo
            .new_cards(learner_id, deck_id, self.new_cards_per_session)?;

        tracing::debug!(
            learner_id,
            deck_id,
            due = review_cards.len(),
            new = new_cards.len(),
            "built study queue"
        );

        Ok(StudyQueue {
            review_remaining: self.reviews_per_session.saturating_sub(review_cards.len()),
            new_remaining: self.new_cards_per_session.saturating_sub(new_cards.len()),
            review_cards,
            new_cards,
        })
    }

    /// Number of cards due for the learner across all decks.
    pub fn cards_due(&self, learner_id: i64, today: NaiveDate) -> Result<usize> {
        self.repo.count_due(learner_id, today).map_err(Into::into)
    }
}
