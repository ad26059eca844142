//! Working-hours configuration shared by every report.

use serde::{Deserialize, Serialize};

use crate::breaks::BreakInterval;
use crate::error::EngineError;

const SECONDS_PER_DAY: u32 = 86_400;

/// Shop-floor working window, breaks and availability constants.
///
/// Defaults reproduce the factory schedule: 08:25 to 19:35 with breaks at
/// 10:30, 13:20 and 16:20.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkingHoursPolicy {
    /// Start of the working window, seconds since midnight.
    pub day_start_seconds: u32,

    /// End of the working window, seconds since midnight.
    pub day_end_seconds: u32,

    /// Scheduled breaks, ordered and disjoint.
    pub breaks: Vec<BreakInterval>,

    /// Hours deducted from a full past day. A flat approximation of the
    /// break time, not the sum of the break lengths.
    pub past_day_allowance_hours: f64,

    /// Hours per working day assumed by machine reports.
    pub machine_daily_hours: f64,

    /// Hours per working day assumed by the all-operator summary.
    pub operator_summary_daily_hours: f64,
}

impl Default for WorkingHoursPolicy {
    fn default() -> Self {
        Self {
            day_start_seconds: 30_300, // 08:25
            day_end_seconds: 70_500,   // 19:35
            breaks: vec![
                BreakInterval::new(37_800, 38_400, 10), // 10:30-10:40
                BreakInterval::new(48_000, 50_400, 40), // 13:20-14:00
                BreakInterval::new(58_800, 59_400, 10), // 16:20-16:30
            ],
            past_day_allowance_hours: 1.0,
            machine_daily_hours: 11.0,
            operator_summary_daily_hours: 10.0,
        }
    }
}

impl WorkingHoursPolicy {
    /// Length of the working window in hours.
    pub fn window_hours(&self) -> f64 {
        f64::from(self.day_end_seconds.saturating_sub(self.day_start_seconds)) / 3600.0
    }

    /// Checks the window and break invariants.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |message: String| Err(EngineError::InvalidPolicy { message });

        if self.day_start_seconds >= self.day_end_seconds {
            return invalid(format!(
                "day start ({}) must be before day end ({})",
                self.day_start_seconds, self.day_end_seconds
            ));
        }
        if self.day_end_seconds > SECONDS_PER_DAY {
            return invalid(format!(
                "day end ({}) is past midnight",
                self.day_end_seconds
            ));
        }

        let mut previous_end: Option<u32> = None;
        for interval in &self.breaks {
            if interval.start_seconds >= interval.end_seconds {
                return invalid(format!("break {interval} is empty or reversed"));
            }
            if interval.start_seconds < self.day_start_seconds
                || interval.end_seconds > self.day_end_seconds
            {
                return invalid(format!("break {interval} falls outside the working window"));
            }
            if previous_end.is_some_and(|end| interval.start_seconds < end) {
                return invalid(format!(
                    "break {interval} overlaps or precedes the previous break"
                ));
            }
            previous_end = Some(interval.end_seconds);
        }

        for (name, value) in [
            ("past_day_allowance_hours", self.past_day_allowance_hours),
            ("machine_daily_hours", self.machine_daily_hours),
            (
                "operator_summary_daily_hours",
                self.operator_summary_daily_hours,
            ),
        ] {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{name} must be a non-negative number, got {value}"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        let policy = WorkingHoursPolicy::default();
        policy.validate().unwrap();
        assert!((policy.window_hours() - 40_200.0 / 3600.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_reversed_window() {
        let policy = WorkingHoursPolicy {
            day_start_seconds: 70_500,
            day_end_seconds: 30_300,
            breaks: vec![],
            ..WorkingHoursPolicy::default()
        };
        let err = policy.validate().unwrap_err();
        assert!(matches!(err, EngineError::InvalidPolicy { .. }));
    }

    #[test]
    fn rejects_overlapping_breaks() {
        let policy = WorkingHoursPolicy {
            breaks: vec![
                BreakInterval::new(37_800, 38_400, 10),
                BreakInterval::new(38_000, 39_000, 10),
            ],
            ..WorkingHoursPolicy::default()
        };
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("overlaps"), "{err}");
    }

    #[test]
    fn rejects_break_outside_window() {
        let policy = WorkingHoursPolicy {
            breaks: vec![BreakInterval::new(28_800, 29_400, 10)],
            ..WorkingHoursPolicy::default()
        };
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("outside"), "{err}");
    }

    #[test]
    fn touching_breaks_are_disjoint() {
        let policy = WorkingHoursPolicy {
            breaks: vec![
                BreakInterval::new(37_800, 38_400, 10),
                BreakInterval::new(38_400, 39_000, 10),
            ],
            ..WorkingHoursPolicy::default()
        };
        policy.validate().unwrap();
    }
}
