//! SM-2 (SuperMemo 2) spaced repetition algorithm with a four-button rating scale.
//!
//! - Ratings map onto SM-2 qualities: again → 0, hard → 2, good → 4, easy → 5
//! - `again`: interval and repetitions reset to 0
//! - `hard`, `good`, `easy`: interval grows 1 day → 6 days → interval × EF
//! - EF is adjusted after every review, failures included, and never falls below 1.3
//!
//! Everything here is pure: the caller supplies the review time.

use super::schedule::MIN_EASE_FACTOR;
use super::{Rating, Schedule, ScheduleInput};
use crate::error::ValidationError;
use chrono::{DateTime, Duration, Utc};

/// Applies one review to a schedule.
pub fn calculate_next_review(schedule: &Schedule, rating: Rating) -> Schedule {
    let quality = rating.quality();

    let (interval, repetitions) = if rating.is_success() {
        let interval = match schedule.repetitions {
            0 => 1,
            1 => 6,
            // Growth uses the ease factor from before this review
            _ => (f64::from(schedule.interval) * schedule.ease_factor).round() as u32,
        };
        (interval, schedule.repetitions.saturating_add(1))
    } else {
        (0, 0)
    };

    Schedule {
        ease_factor: next_ease_factor(schedule.ease_factor, quality),
        interval,
        repetitions,
    }
}

/// Validates partial caller state, filling in defaults, then applies the review.
pub fn calculate_from_input(
    input: &ScheduleInput,
    rating: Rating,
) -> Result<Schedule, ValidationError> {
    let schedule = input.validate()?;
    Ok(calculate_next_review(&schedule, rating))
}

/// EF' = max(1.3, EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)))
pub fn next_ease_factor(ease_factor: f64, quality: u8) -> f64 {
    let miss = f64::from(5 - quality.min(5));
    let ease_factor = ease_factor + (0.1 - miss * (0.08 + miss * 0.02));
    ease_factor.max(MIN_EASE_FACTOR)
}

/// Due date for a review done at `reviewed_at`. Saturates at the latest representable instant.
pub fn next_review_date(reviewed_at: DateTime<Utc>, interval: u32) -> DateTime<Utc> {
    reviewed_at
        .checked_add_signed(Duration::days(i64::from(interval)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// The interval each rating would produce, in `Rating::ALL` order.
pub fn preview_intervals(schedule: &Schedule) -> [(Rating, u32); 4] {
    Rating::ALL.map(|rating| (rating, calculate_next_review(schedule, rating).interval))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schedule(ease_factor: f64, interval: u32, repetitions: u32) -> Schedule {
        Schedule {
            ease_factor,
            interval,
            repetitions,
        }
    }

    fn assert_ease(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "ease factor {actual} != {expected}"
        );
    }

    #[test]
    fn test_first_review() {
        let next = calculate_next_review(&Schedule::default(), Rating::Good);
        assert_eq!(next.interval, 1);
        assert_eq!(next.repetitions, 1);
        assert_ease(next.ease_factor, 2.5);
    }

    #[test]
    fn test_second_review() {
        let next = calculate_next_review(&schedule(2.5, 1, 1), Rating::Good);
        assert_eq!(next.interval, 6);
        assert_eq!(next.repetitions, 2);
        assert_ease(next.ease_factor, 2.5);
    }

    #[test]
    fn test_third_review_multiplies_by_ease() {
        let next = calculate_next_review(&schedule(2.5, 6, 2), Rating::Good);
        assert_eq!(next.interval, 15);
        assert_eq!(next.repetitions, 3);
        assert_ease(next.ease_factor, 2.5);
    }

    #[test]
    fn test_again_resets_progress() {
        let next = calculate_next_review(&schedule(2.5, 15, 3), Rating::Again);
        assert_eq!(next.interval, 0);
        assert_eq!(next.repetitions, 0);
        // EF is still updated on failure
        assert_ease(next.ease_factor, 1.7);
    }

    #[test]
    fn test_easy_from_fresh_card() {
        let next = calculate_next_review(&Schedule::default(), Rating::Easy);
        assert_eq!(next.interval, 1);
        assert_eq!(next.repetitions, 1);
        assert_ease(next.ease_factor, 2.6);
    }

    #[test]
    fn test_hard_counts_as_success_but_lowers_ease() {
        let next = calculate_next_review(&schedule(2.5, 6, 2), Rating::Hard);
        assert_eq!(next.interval, 15);
        assert_eq!(next.repetitions, 3);
        assert_ease(next.ease_factor, 2.18);
    }

    #[test]
    fn test_growth_uses_ease_before_update() {
        // round(10 * 2.5) = 25; with the updated EF (2.6) it would be 26
        let next = calculate_next_review(&schedule(2.5, 10, 4), Rating::Easy);
        assert_eq!(next.interval, 25);
        assert_ease(next.ease_factor, 2.6);
    }

    #[test]
    fn test_interval_rounds_to_nearest_day() {
        // 7 * 1.3 = 9.1
        assert_eq!(calculate_next_review(&schedule(1.3, 7, 3), Rating::Good).interval, 9);
        // 7 * 2.5 = 17.5
        assert_eq!(calculate_next_review(&schedule(2.5, 7, 3), Rating::Good).interval, 18);
    }

    #[test]
    fn test_ef_floor() {
        let next = calculate_next_review(&schedule(1.3, 1, 1), Rating::Again);
        assert_eq!(next.ease_factor, MIN_EASE_FACTOR);

        let next = calculate_next_review(&schedule(1.7, 15, 3), Rating::Again);
        assert_eq!(next.ease_factor, MIN_EASE_FACTOR);
    }

    #[test]
    fn test_success_after_failure_restarts_progression() {
        let failed = calculate_next_review(&schedule(2.5, 40, 5), Rating::Again);
        let first = calculate_next_review(&failed, Rating::Good);
        let second = calculate_next_review(&first, Rating::Good);
        assert_eq!((first.interval, first.repetitions), (1, 1));
        assert_eq!((second.interval, second.repetitions), (6, 2));
    }

    #[test]
    fn test_transition_is_deterministic() {
        let state = schedule(2.1, 9, 4);
        for rating in Rating::ALL {
            assert_eq!(
                calculate_next_review(&state, rating),
                calculate_next_review(&state, rating)
            );
        }
    }

    #[test]
    fn test_invariants_hold_over_long_sequences() {
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut state = Schedule::default();

        for _ in 0..2_000 {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let rating = Rating::ALL[(seed >> 33) as usize % 4];
            let before = state;
            state = calculate_next_review(&state, rating);

            assert!(state.ease_factor >= MIN_EASE_FACTOR);
            if rating == Rating::Again {
                assert_eq!(state.repetitions, 0);
                assert_eq!(state.interval, 0);
            } else {
                assert_eq!(state.repetitions, before.repetitions + 1);
                assert!(state.interval >= 1);
            }
        }
    }

    #[test]
    fn test_calculate_from_partial_input() {
        let next = calculate_from_input(&ScheduleInput::default(), Rating::Good).unwrap();
        assert_eq!(next, calculate_next_review(&Schedule::default(), Rating::Good));

        let input = ScheduleInput {
            interval: Some(6),
            repetitions: Some(2),
            ..Default::default()
        };
        assert_eq!(calculate_from_input(&input, Rating::Good).unwrap().interval, 15);
    }

    #[test]
    fn test_calculate_from_malformed_input() {
        let input = ScheduleInput {
            interval: Some(-4),
            ..Default::default()
        };
        assert_eq!(
            calculate_from_input(&input, Rating::Good),
            Err(ValidationError::NegativeInterval(-4))
        );
    }

    #[test]
    fn test_preview_intervals() {
        let preview = preview_intervals(&schedule(2.5, 6, 2));
        assert_eq!(
            preview,
            [
                (Rating::Again, 0),
                (Rating::Hard, 15),
                (Rating::Good, 15),
                (Rating::Easy, 15),
            ]
        );
    }

    #[test]
    fn test_next_review_date() {
        let reviewed_at = Utc.with_ymd_and_hms(2024, 1, 30, 8, 0, 0).unwrap();
        assert_eq!(next_review_date(reviewed_at, 0), reviewed_at);
        assert_eq!(
            next_review_date(reviewed_at, 6),
            Utc.with_ymd_and_hms(2024, 2, 5, 8, 0, 0).unwrap()
        );
        assert_eq!(next_review_date(reviewed_at, u32::MAX), DateTime::<Utc>::MAX_UTC);
    }
}
