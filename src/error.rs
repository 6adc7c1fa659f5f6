//! Error types for the review scheduler, its stores, config and backups.

use thiserror::Error;
use uuid::Uuid;

/// Malformed input rejected before any scheduling or persistence happens.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("unknown rating '{0}', expected one of: again, hard, good, easy")]
    UnknownRating(String),

    #[error("interval must be non-negative, got {0}")]
    NegativeInterval(i64),

    #[error("interval of {0} days is out of range")]
    IntervalOutOfRange(i64),

    #[error("repetitions must be non-negative, got {0}")]
    NegativeRepetitions(i64),

    #[error("repetition count {0} is out of range")]
    RepetitionsOutOfRange(i64),

    #[error("ease factor must be a finite number >= 1.3, got {0}")]
    InvalidEaseFactor(f64),

    #[error("timestamp {0} is out of range")]
    InvalidTimestamp(i64),

    #[error("{0} must not be empty")]
    EmptyKey(&'static str),
}

/// Failure reported by a card store.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored card {id} is malformed: {source}")]
    MalformedRow {
        id: Uuid,
        #[source]
        source: ValidationError,
    },

    #[error("card id {0} is already stored under another owner or source")]
    IdConflict(Uuid),

    #[error("card store lock poisoned")]
    Poisoned,

    #[error("card store unavailable: {0}")]
    Unavailable(String),
}

/// Error returned by the caller-facing review API.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("card not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub type Result<T> = std::result::Result<T, ReviewError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid card in backup: {0}")]
    Validation(#[from] ValidationError),
}
