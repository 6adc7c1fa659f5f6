//! SQLite card store
//!
//! One `review_cards` table holds the scheduling state of every card, unique
//! per `(owner_id, source_ref)`. Timestamps are stored as unix seconds and
//! rows are validated when read back.

use super::{CardFilter, CardStore, StoreResult};
use crate::error::{PersistenceError, ValidationError};
use crate::models::{ReviewCard, ReviewUpdate, ScheduleInput};
use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const CARD_COLUMNS: &str = "id, owner_id, source_ref, ease_factor, interval_days, repetitions, \
                            next_review_date, last_reviewed_at";

pub struct SqliteCardStore {
    conn: Mutex<Connection>,
}

impl SqliteCardStore {
    /// Opens (or creates) the database file and makes sure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        info!("Opening card store at {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> StoreResult<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| PersistenceError::Poisoned)
    }
}

/// Creates the review_cards table and its due-date index
fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS review_cards (
            id BLOB PRIMARY KEY,
            owner_id TEXT NOT NULL,
            source_ref TEXT NOT NULL,
            ease_factor REAL NOT NULL DEFAULT 2.5,
            interval_days INTEGER NOT NULL DEFAULT 0,
            repetitions INTEGER NOT NULL DEFAULT 0,
            next_review_date INTEGER NOT NULL,
            last_reviewed_at INTEGER,
            UNIQUE(owner_id, source_ref)
        )",
        (),
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_review_cards_due
         ON review_cards (owner_id, next_review_date)",
        (),
    )?;

    Ok(())
}

/// Raw row, checked by `into_card`
struct CardRow {
    id: Uuid,
    owner_id: String,
    source_ref: String,
    ease_factor: f64,
    interval_days: i64,
    repetitions: i64,
    next_review_date: i64,
    last_reviewed_at: Option<i64>,
}

impl CardRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            source_ref: row.get(2)?,
            ease_factor: row.get(3)?,
            interval_days: row.get(4)?,
            repetitions: row.get(5)?,
            next_review_date: row.get(6)?,
            last_reviewed_at: row.get(7)?,
        })
    }

    fn into_card(self) -> StoreResult<ReviewCard> {
        let id = self.id;
        let malformed = |source| PersistenceError::MalformedRow { id, source };

        let schedule = ScheduleInput {
            ease_factor: Some(self.ease_factor),
            interval: Some(self.interval_days),
            repetitions: Some(self.repetitions),
        }
        .validate()
        .map_err(malformed)?;

        let next_review_date = from_timestamp(self.next_review_date).map_err(malformed)?;
        let last_reviewed_at = self
            .last_reviewed_at
            .map(from_timestamp)
            .transpose()
            .map_err(malformed)?;

        Ok(ReviewCard {
            id,
            owner_id: self.owner_id,
            source_ref: self.source_ref,
            ease_factor: schedule.ease_factor,
            interval: schedule.interval,
            repetitions: schedule.repetitions,
            next_review_date,
            last_reviewed_at,
        })
    }
}

fn from_timestamp(secs: i64) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::from_timestamp(secs, 0).ok_or(ValidationError::InvalidTimestamp(secs))
}

fn select_by_key(conn: &Connection, owner_id: &str, source_ref: &str) -> StoreResult<ReviewCard> {
    let row = conn.query_row(
        &format!("SELECT {CARD_COLUMNS} FROM review_cards WHERE owner_id = ?1 AND source_ref = ?2"),
        params![owner_id, source_ref],
        CardRow::from_row,
    )?;
    row.into_card()
}

impl CardStore for SqliteCardStore {
    fn find(&self, owner_id: &str, filter: &CardFilter) -> StoreResult<Vec<ReviewCard>> {
        let conn = self.lock()?;

        let (condition, value) = match filter {
            CardFilter::All => ("", None),
            CardFilter::DueBy(as_of) => (
                " AND next_review_date <= ?2",
                Some(rusqlite::types::Value::Integer(as_of.timestamp())),
            ),
            CardFilter::SourceRef(source_ref) => (
                " AND source_ref = ?2",
                Some(rusqlite::types::Value::Text(source_ref.clone())),
            ),
        };

        let mut stmt = conn.prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM review_cards
             WHERE owner_id = ?1{condition}
             ORDER BY next_review_date ASC, source_ref ASC"
        ))?;

        let rows = match value {
            Some(value) => stmt
                .query_map(params![owner_id, value], CardRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt
                .query_map(params![owner_id], CardRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };

        rows.into_iter().map(CardRow::into_card).collect()
    }

    fn get(&self, card_id: Uuid) -> StoreResult<Option<ReviewCard>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {CARD_COLUMNS} FROM review_cards WHERE id = ?1"),
            params![card_id],
            CardRow::from_row,
        )
        .optional()?
        .map(CardRow::into_card)
        .transpose()
    }

    fn find_or_create(&self, card: ReviewCard) -> StoreResult<(ReviewCard, bool)> {
        let conn = self.lock()?;

        // Insert card (or ignore if the owner already has one for this source)
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO review_cards
             (id, owner_id, source_ref, ease_factor, interval_days, repetitions, next_review_date, last_reviewed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                card.id,
                card.owner_id,
                card.source_ref,
                card.ease_factor,
                card.interval,
                card.repetitions,
                card.next_review_date.timestamp(),
                card.last_reviewed_at.map(|t| t.timestamp()),
            ],
        )?;

        if inserted > 0 {
            debug!("Created card {} for {}/{}", card.id, card.owner_id, card.source_ref);
        }

        let stored = select_by_key(&conn, &card.owner_id, &card.source_ref)?;
        Ok((stored, inserted > 0))
    }

    fn upsert(&self, card: &ReviewCard) -> StoreResult<ReviewCard> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO review_cards
             (id, owner_id, source_ref, ease_factor, interval_days, repetitions, next_review_date, last_reviewed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(owner_id, source_ref) DO UPDATE SET
                ease_factor = excluded.ease_factor,
                interval_days = excluded.interval_days,
                repetitions = excluded.repetitions,
                next_review_date = excluded.next_review_date,
                last_reviewed_at = excluded.last_reviewed_at",
            params![
                card.id,
                card.owner_id,
                card.source_ref,
                card.ease_factor,
                card.interval,
                card.repetitions,
                card.next_review_date.timestamp(),
                card.last_reviewed_at.map(|t| t.timestamp()),
            ],
        )?;

        select_by_key(&conn, &card.owner_id, &card.source_ref)
    }

    fn update(&self, card_id: Uuid, update: &ReviewUpdate) -> StoreResult<bool> {
        let conn = self.lock()?;

        let changed = conn.execute(
            "UPDATE review_cards
             SET ease_factor = ?1, interval_days = ?2, repetitions = ?3,
                 next_review_date = ?4, last_reviewed_at = ?5
             WHERE id = ?6",
            params![
                update.schedule.ease_factor,
                update.schedule.interval,
                update.schedule.repetitions,
                update.next_review_date.timestamp(),
                update.last_reviewed_at.timestamp(),
                card_id
            ],
        )?;

        Ok(changed > 0)
    }

    fn delete(&self, card_id: Uuid) -> StoreResult<bool> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM review_cards WHERE id = ?1", params![card_id])?;
        Ok(removed > 0)
    }
}
