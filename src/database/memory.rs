//! In-process card store, used in tests and by embedders without a database.

use super::{CardFilter, CardStore, StoreResult};
use crate::error::PersistenceError;
use crate::models::{ReviewCard, ReviewUpdate};
use log::debug;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct Cards {
    by_id: HashMap<Uuid, ReviewCard>,
    /// (owner_id, source_ref) -> id
    by_key: HashMap<(String, String), Uuid>,
}

#[derive(Default)]
pub struct MemoryCardStore {
    cards: Mutex<Cards>,
}

impl MemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Cards>> {
        self.cards.lock().map_err(|_| PersistenceError::Poisoned)
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.lock()?.by_id.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

fn key_of(card: &ReviewCard) -> (String, String) {
    (card.owner_id.clone(), card.source_ref.clone())
}

impl CardStore for MemoryCardStore {
    fn find(&self, owner_id: &str, filter: &CardFilter) -> StoreResult<Vec<ReviewCard>> {
        let cards = self.lock()?;
        let mut found: Vec<ReviewCard> = cards
            .by_id
            .values()
            .filter(|card| card.owner_id == owner_id && filter.matches(card))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.next_review_date
                .cmp(&b.next_review_date)
                .then_with(|| a.source_ref.cmp(&b.source_ref))
        });
        Ok(found)
    }

    fn get(&self, card_id: Uuid) -> StoreResult<Option<ReviewCard>> {
        Ok(self.lock()?.by_id.get(&card_id).cloned())
    }

    fn find_or_create(&self, card: ReviewCard) -> StoreResult<(ReviewCard, bool)> {
        let mut cards = self.lock()?;
        let key = key_of(&card);

        if let Some(existing) = cards.by_key.get(&key).and_then(|id| cards.by_id.get(id)) {
            return Ok((existing.clone(), false));
        }

        debug!("Creating card {} for {}/{}", card.id, key.0, key.1);
        cards.by_key.insert(key, card.id);
        cards.by_id.insert(card.id, card.clone());
        Ok((card, true))
    }

    fn upsert(&self, card: &ReviewCard) -> StoreResult<ReviewCard> {
        let mut cards = self.lock()?;
        let key = key_of(card);

        if cards.by_id.get(&card.id).is_some_and(|existing| key_of(existing) != key) {
            return Err(PersistenceError::IdConflict(card.id));
        }

        let id = *cards.by_key.entry(key).or_insert(card.id);

        let stored = ReviewCard {
            id,
            ..card.clone()
        };
        cards.by_id.insert(id, stored.clone());
        Ok(stored)
    }

    fn update(&self, card_id: Uuid, update: &ReviewUpdate) -> StoreResult<bool> {
        let mut cards = self.lock()?;
        match cards.by_id.get_mut(&card_id) {
            Some(card) => {
                card.apply(update);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, card_id: Uuid) -> StoreResult<bool> {
        let mut cards = self.lock()?;
        match cards.by_id.remove(&card_id) {
            Some(card) => {
                cards.by_key.remove(&key_of(&card));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
