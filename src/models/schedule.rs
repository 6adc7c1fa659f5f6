//! Scheduling state of a card: ease factor, interval and repetition streak.
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
/// Ease factor never drops below this, however badly the learner performs.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Validated scheduling triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub ease_factor: f64,
    /// Days until the next review; 0 means due immediately.
    pub interval: u32,
    /// Consecutive successful reviews since the last failure.
    pub repetitions: u32,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            ease_factor: DEFAULT_EASE_FACTOR,
            interval: 0,
            repetitions: 0,
        }
    }
}

/// Partial, unchecked scheduling state as supplied by callers or read from storage.
/// Missing fields fall back to the never-reviewed defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInput {
    pub ease_factor: Option<f64>,
    pub interval: Option<i64>,
    pub repetitions: Option<i64>,
}

impl ScheduleInput {
    pub fn validate(&self) -> Result<Schedule, ValidationError> {
        let defaults = Schedule::default();

        let ease_factor = self.ease_factor.unwrap_or(defaults.ease_factor);
        if !ease_factor.is_finite() || ease_factor < MIN_EASE_FACTOR {
            return Err(ValidationError::InvalidEaseFactor(ease_factor));
        }

        let interval = match self.interval {
            None => defaults.interval,
            Some(days) if days < 0 => return Err(ValidationError::NegativeInterval(days)),
            Some(days) => {
                u32::try_from(days).map_err(|_| ValidationError::IntervalOutOfRange(days))?
            }
        };

        let repetitions = match self.repetitions {
            None => defaults.repetitions,
            Some(n) if n < 0 => return Err(ValidationError::NegativeRepetitions(n)),
            Some(n) => u32::try_from(n).map_err(|_| ValidationError::RepetitionsOutOfRange(n))?,
        };

        Ok(Schedule {
            ease_factor,
            interval,
            repetitions,
        })
    }
}

impl From<Schedule> for ScheduleInput {
    fn from(schedule: Schedule) -> Self {
        Self {
            ease_factor: Some(schedule.ease_factor),
            interval: Some(i64::from(schedule.interval)),
            repetitions: Some(i64::from(schedule.repetitions)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_gives_defaults() {
        let schedule = ScheduleInput::default().validate().unwrap();
        assert_eq!(schedule, Schedule::default());
        assert_eq!(schedule.ease_factor, 2.5);
    }

    #[test]
    fn test_partial_input_keeps_given_fields() {
        let input = ScheduleInput {
            interval: Some(6),
            ..Default::default()
        };
        let schedule = input.validate().unwrap();
        assert_eq!(schedule.interval, 6);
        assert_eq!(schedule.repetitions, 0);
        assert_eq!(schedule.ease_factor, DEFAULT_EASE_FACTOR);
    }

    #[test]
    fn test_negative_interval_rejected() {
        let input = ScheduleInput {
            interval: Some(-1),
            ..Default::default()
        };
        assert_eq!(input.validate(), Err(ValidationError::NegativeInterval(-1)));
    }

    #[test]
    fn test_negative_repetitions_rejected() {
        let input = ScheduleInput {
            repetitions: Some(-3),
            ..Default::default()
        };
        assert_eq!(
            input.validate(),
            Err(ValidationError::NegativeRepetitions(-3))
        );
    }

    #[test]
    fn test_bad_ease_factor_rejected() {
        for ease in [1.2, f64::NAN, f64::INFINITY] {
            let input = ScheduleInput {
                ease_factor: Some(ease),
                ..Default::default()
            };
            assert!(matches!(
                input.validate(),
                Err(ValidationError::InvalidEaseFactor(_))
            ));
        }
    }

    #[test]
    fn test_interval_too_large_rejected() {
        let input = ScheduleInput {
            interval: Some(i64::from(u32::MAX) + 1),
            ..Default::default()
        };
        assert!(matches!(
            input.validate(),
            Err(ValidationError::IntervalOutOfRange(_))
        ));
    }

    #[test]
    fn test_repetitions_too_large_rejected() {
        let input = ScheduleInput {
            repetitions: Some(i64::from(u32::MAX) + 1),
            ..Default::default()
        };
        assert_eq!(
            input.validate(),
            Err(ValidationError::RepetitionsOutOfRange(i64::from(u32::MAX) + 1))
        );

        let at_limit = ScheduleInput {
            repetitions: Some(i64::from(u32::MAX)),
            ..Default::default()
        };
        assert_eq!(at_limit.validate().unwrap().repetitions, u32::MAX);
    }

    #[test]
    fn test_missing_json_fields_deserialize_as_none() {
        let input: ScheduleInput = serde_json::from_str(r#"{"easeFactor": 1.9}"#).unwrap();
        assert_eq!(input.ease_factor, Some(1.9));
        assert_eq!(input.interval, None);
        assert_eq!(input.repetitions, None);
    }
}
