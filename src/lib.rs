pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod lifecycle;
pub mod models;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use database::{CardFilter, CardStore, MemoryCardStore, SqliteCardStore};
pub use error::{PersistenceError, Result, ReviewError, ValidationError};
pub use lifecycle::{CardLifecycleManager, InitializationReport, ReviewStats};
pub use models::{Rating, ReviewCard, Schedule, ScheduleInput};
