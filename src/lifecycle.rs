//! Card lifecycle management on top of the SM-2 scheduler.
//! Creates scheduling state for new material and applies review events,
//! writing every result back to the card store.

use crate::clock::{Clock, SystemClock};
use crate::database::{CardFilter, CardStore};
use crate::error::{ReviewError, Result, ValidationError};
use crate::export::json::CardBackup;
use crate::models::sm2::{calculate_next_review, preview_intervals};
use crate::models::{Rating, ReviewCard, ReviewUpdate, ScheduleInput};
use chrono::{DateTime, NaiveTime, SubsecRound, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use uuid::Uuid;

/// Per-owner review counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    /// Cards due before the end of the current (UTC) calendar day, overdue ones included
    pub due_today: usize,
    /// Cards with at least `LEARNED_REPETITIONS` consecutive successes
    pub learned: usize,
    pub total_cards: usize,
}

#[derive(Debug)]
pub struct InitializationFailure {
    pub source_ref: String,
    pub error: ReviewError,
}

/// Outcome of a batch import; every requested source ref lands in exactly one list.
#[derive(Debug, Default)]
pub struct InitializationReport {
    pub created: Vec<String>,
    /// Already had a card; its progress was kept.
    pub existing: Vec<String>,
    pub failed: Vec<InitializationFailure>,
}

impl InitializationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &str> {
        self.created
            .iter()
            .chain(self.existing.iter())
            .map(String::as_str)
    }
}

pub struct CardLifecycleManager<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S: CardStore> CardLifecycleManager<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: CardStore, C: Clock> CardLifecycleManager<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Owner's cards due at `as_of` (default: now), earliest first.
    pub fn get_due_cards(
        &self,
        owner_id: &str,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<ReviewCard>> {
        let as_of = as_of.unwrap_or_else(|| self.now());
        Ok(self.store.find(owner_id, &CardFilter::DueBy(as_of))?)
    }

    pub fn get_stats(&self, owner_id: &str) -> Result<ReviewStats> {
        let cards = self.store.find(owner_id, &CardFilter::All)?;
        let day_end = start_of_next_day(self.now());

        Ok(ReviewStats {
            due_today: cards
                .iter()
                .filter(|card| day_end.is_none_or(|end| card.next_review_date < end))
                .count(),
            learned: cards.iter().filter(|card| card.is_learned()).count(),
            total_cards: cards.len(),
        })
    }

    /// Creates a default card for every source ref that does not have one yet.
    /// Existing cards keep their progress. Failures are collected per source ref
    /// instead of aborting the batch.
    pub fn initialize_cards<I, R>(&self, owner_id: &str, source_refs: I) -> InitializationReport
    where
        I: IntoIterator<Item = R>,
        R: AsRef<str>,
    {
        let now = self.now();
        let mut report = InitializationReport::default();

        for source_ref in source_refs {
            let source_ref = source_ref.as_ref();
            let result = check_key(owner_id, source_ref).and_then(|()| {
                Ok(self
                    .store
                    .find_or_create(ReviewCard::new(owner_id, source_ref, now))?)
            });

            match result {
                Ok((_, true)) => report.created.push(source_ref.to_string()),
                Ok((_, false)) => report.existing.push(source_ref.to_string()),
                Err(error) => {
                    warn!("Failed to initialize card {owner_id}/{source_ref}: {error}");
                    report.failed.push(InitializationFailure {
                        source_ref: source_ref.to_string(),
                        error,
                    });
                }
            }
        }

        info!(
            "Initialized cards for {owner_id}: {} created, {} existing, {} failed",
            report.created.len(),
            report.existing.len(),
            report.failed.len()
        );
        report
    }

    /// Applies a rating to an existing card owned by `owner_id`.
    pub fn review_card(&self, owner_id: &str, card_id: Uuid, rating: Rating) -> Result<ReviewCard> {
        let mut card = self.owned_card(owner_id, card_id)?;

        let schedule = calculate_next_review(&card.schedule(), rating);
        let update = ReviewUpdate::new(schedule, self.now());

        // The card may have been deleted since it was read
        if !self.store.update(card_id, &update)? {
            return Err(ReviewError::NotFound(card_id));
        }

        debug!(
            "Reviewed card {card_id} as {rating}: interval {} -> {}, repetitions {} -> {}",
            card.interval, schedule.interval, card.repetitions, schedule.repetitions
        );
        card.apply(&update);
        Ok(card)
    }

    /// Like `review_card`, but keyed by source material. A card that does not
    /// exist yet starts from the default schedule.
    pub fn review_or_create(
        &self,
        owner_id: &str,
        source_ref: &str,
        rating: Rating,
    ) -> Result<ReviewCard> {
        check_key(owner_id, source_ref)?;
        let now = self.now();

        let mut card = self
            .store
            .find(owner_id, &CardFilter::SourceRef(source_ref.to_string()))?
            .into_iter()
            .next()
            .unwrap_or_else(|| ReviewCard::new(owner_id, source_ref, now));

        let schedule = calculate_next_review(&card.schedule(), rating);
        card.apply(&ReviewUpdate::new(schedule, now));

        let stored = self.store.upsert(&card)?;
        debug!("Reviewed {owner_id}/{source_ref} as {rating}: interval {}", stored.interval);
        Ok(stored)
    }

    /// Removes a card. Returns false, without error, if the owner has no such card.
    pub fn delete_card(&self, owner_id: &str, card_id: Uuid) -> Result<bool> {
        match self.store.get(card_id)? {
            Some(card) if card.owner_id == owner_id => Ok(self.store.delete(card_id)?),
            Some(_) => {
                warn!("Refusing to delete card {card_id}: not owned by {owner_id}");
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Interval each rating would give the card, for showing on rating buttons.
    pub fn preview_card(&self, owner_id: &str, card_id: Uuid) -> Result<[(Rating, u32); 4]> {
        let card = self.owned_card(owner_id, card_id)?;
        Ok(preview_intervals(&card.schedule()))
    }

    pub fn export_owner(&self, owner_id: &str) -> Result<CardBackup> {
        let cards = self.store.find(owner_id, &CardFilter::All)?;
        Ok(CardBackup {
            owner_id: owner_id.to_string(),
            exported_at: self.now(),
            cards,
        })
    }

    /// Writes every card of a backup under `owner_id`, overwriting progress of
    /// cards with the same source ref. Nothing is written if any card is invalid.
    /// Returns the number of cards restored.
    pub fn restore_backup(&self, owner_id: &str, backup: &CardBackup) -> Result<usize> {
        for card in &backup.cards {
            check_key(owner_id, &card.source_ref)?;
            ScheduleInput::from(card.schedule()).validate()?;
        }

        for card in &backup.cards {
            // Fresh id: a card already stored under this owner keeps its own on upsert
            let card = ReviewCard {
                id: Uuid::new_v4(),
                owner_id: owner_id.to_string(),
                next_review_date: card.next_review_date.trunc_subsecs(0),
                last_reviewed_at: card.last_reviewed_at.map(|t| t.trunc_subsecs(0)),
                ..card.clone()
            };
            self.store.upsert(&card)?;
        }

        info!(
            "Restored {} cards for {owner_id} from backup of {}",
            backup.cards.len(),
            backup.owner_id
        );
        Ok(backup.cards.len())
    }

    /// Review times are kept to whole seconds, the resolution card stores persist.
    fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(0)
    }

    fn owned_card(&self, owner_id: &str, card_id: Uuid) -> Result<ReviewCard> {
        self.store
            .get(card_id)?
            .filter(|card| card.owner_id == owner_id)
            .ok_or(ReviewError::NotFound(card_id))
    }
}

fn check_key(owner_id: &str, source_ref: &str) -> Result<()> {
    if owner_id.is_empty() {
        return Err(ValidationError::EmptyKey("owner id").into());
    }
    if source_ref.is_empty() {
        return Err(ValidationError::EmptyKey("source ref").into());
    }
    Ok(())
}

/// Midnight (UTC) after `now`; `None` at the end of the representable range.
fn start_of_next_day(now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    now.date_naive()
        .succ_opt()
        .map(|day| day.and_time(NaiveTime::MIN).and_utc())
}
