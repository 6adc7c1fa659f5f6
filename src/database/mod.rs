//! Persistence boundary for card scheduling state.
//!
//! Stores are partitioned by owner: `find` only ever returns the given
//! owner's cards. Every write touches exactly one card, and concurrent
//! writes to the same card resolve as last-write-wins.

pub mod db;
pub mod memory;

pub use db::SqliteCardStore;
pub use memory::MemoryCardStore;

use crate::error::PersistenceError;
use crate::models::{ReviewCard, ReviewUpdate};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub type StoreResult<T> = std::result::Result<T, PersistenceError>;

/// Predicate for `CardStore::find`.
#[derive(Debug, Clone, PartialEq)]
pub enum CardFilter {
    All,
    /// Cards with `next_review_date <= t`
    DueBy(DateTime<Utc>),
    SourceRef(String),
}

impl CardFilter {
    pub fn matches(&self, card: &ReviewCard) -> bool {
        match self {
            Self::All => true,
            Self::DueBy(as_of) => card.is_due(*as_of),
            Self::SourceRef(source_ref) => card.source_ref == *source_ref,
        }
    }
}

pub trait CardStore: Send + Sync {
    /// Owner's cards matching `filter`, earliest `next_review_date` first.
    fn find(&self, owner_id: &str, filter: &CardFilter) -> StoreResult<Vec<ReviewCard>>;

    fn get(&self, card_id: Uuid) -> StoreResult<Option<ReviewCard>>;

    /// Inserts `card` unless one already exists for its `(owner_id, source_ref)`.
    /// Returns the stored card and whether it was created; an existing card is left untouched.
    fn find_or_create(&self, card: ReviewCard) -> StoreResult<(ReviewCard, bool)>;

    /// Inserts `card`, or overwrites the scheduling fields of the existing card
    /// with the same `(owner_id, source_ref)`. The existing card keeps its id.
    fn upsert(&self, card: &ReviewCard) -> StoreResult<ReviewCard>;

    /// Returns false if no card has this id.
    fn update(&self, card_id: Uuid, update: &ReviewUpdate) -> StoreResult<bool>;

    /// Returns false if no card has this id.
    fn delete(&self, card_id: Uuid) -> StoreResult<bool>;
}
