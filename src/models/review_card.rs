use super::Schedule;
use super::sm2::next_review_date;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cards with at least this many consecutive successful reviews count as learned.
pub const LEARNED_REPETITIONS: u32 = 3;

/// The schedulable unit. `(owner_id, source_ref)` identifies a card uniquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCard {
    pub id: Uuid,
    pub owner_id: String,
    /// Material being reviewed, e.g. `examA#q1`
    pub source_ref: String,
    pub ease_factor: f64,
    pub interval: u32,
    pub repetitions: u32,
    pub next_review_date: DateTime<Utc>,
    #[serde(default)]
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl ReviewCard {
    /// New, never reviewed card that is due immediately.
    pub fn new(owner_id: &str, source_ref: &str, now: DateTime<Utc>) -> Self {
        let schedule = Schedule::default();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            source_ref: source_ref.to_string(),
            ease_factor: schedule.ease_factor,
            interval: schedule.interval,
            repetitions: schedule.repetitions,
            next_review_date: now,
            last_reviewed_at: None,
        }
    }

    pub fn schedule(&self) -> Schedule {
        Schedule {
            ease_factor: self.ease_factor,
            interval: self.interval,
            repetitions: self.repetitions,
        }
    }

    pub fn is_due(&self, as_of: DateTime<Utc>) -> bool {
        self.next_review_date <= as_of
    }

    pub fn is_learned(&self) -> bool {
        self.repetitions >= LEARNED_REPETITIONS
    }

    pub fn apply(&mut self, update: &ReviewUpdate) {
        self.ease_factor = update.schedule.ease_factor;
        self.interval = update.schedule.interval;
        self.repetitions = update.schedule.repetitions;
        self.next_review_date = update.next_review_date;
        self.last_reviewed_at = Some(update.last_reviewed_at);
    }
}

/// Fields written back to a card after a review.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewUpdate {
    pub schedule: Schedule,
    pub next_review_date: DateTime<Utc>,
    pub last_reviewed_at: DateTime<Utc>,
}

impl ReviewUpdate {
    pub fn new(schedule: Schedule, reviewed_at: DateTime<Utc>) -> Self {
        Self {
            schedule,
            next_review_date: next_review_date(reviewed_at, schedule.interval),
            last_reviewed_at: reviewed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_new_card_is_due_immediately() {
        let card = ReviewCard::new("u1", "examA#q1", noon());
        assert_eq!(card.schedule(), Schedule::default());
        assert_eq!(card.next_review_date, noon());
        assert!(card.last_reviewed_at.is_none());
        assert!(card.is_due(noon()));
        assert!(!card.is_due(noon() - Duration::seconds(1)));
    }

    #[test]
    fn test_apply_sets_dates_from_interval() {
        let mut card = ReviewCard::new("u1", "examA#q1", noon());
        let schedule = Schedule {
            ease_factor: 2.5,
            interval: 6,
            repetitions: 2,
        };
        card.apply(&ReviewUpdate::new(schedule, noon()));

        assert_eq!(card.schedule(), schedule);
        assert_eq!(card.last_reviewed_at, Some(noon()));
        assert_eq!(card.next_review_date, noon() + Duration::days(6));
    }

    #[test]
    fn test_learned_threshold() {
        let mut card = ReviewCard::new("u1", "examA#q1", noon());
        card.repetitions = 2;
        assert!(!card.is_learned());
        card.repetitions = 3;
        assert!(card.is_learned());
    }

    #[test]
    fn test_json_uses_camel_case() {
        let card = ReviewCard::new("u1", "examA#q1", noon());
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["ownerId"], "u1");
        assert_eq!(json["sourceRef"], "examA#q1");
        assert_eq!(json["easeFactor"], 2.5);
        assert!(json["lastReviewedAt"].is_null());
    }
}
