pub mod rating;
pub mod review_card;
pub mod schedule;
pub mod sm2;

pub use rating::Rating;
pub use review_card::{LEARNED_REPETITIONS, ReviewCard, ReviewUpdate};
pub use schedule::{DEFAULT_EASE_FACTOR, MIN_EASE_FACTOR, Schedule, ScheduleInput};
