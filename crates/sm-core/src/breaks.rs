//! Scheduled breaks and the two ways they reduce working time.
//!
//! The strategies are not interchangeable:
//!
//! - [`BreakStrategy::Exclusion`] drops a log entry that lies entirely inside
//!   a break. Partial overlap is kept whole; nothing is prorated.
//! - [`BreakStrategy::Subtraction`] charges each break's fixed penalty once
//!   the end of the measured span has passed the break's end, whether or not
//!   anyone actually stopped.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A fixed break in the working day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakInterval {
    /// Break start, seconds since midnight.
    pub start_seconds: u32,
    /// Break end, seconds since midnight.
    pub end_seconds: u32,
    /// Minutes deducted from same-day availability once the break is over.
    pub penalty_minutes: u32,
}

impl BreakInterval {
    pub const fn new(start_seconds: u32, end_seconds: u32, penalty_minutes: u32) -> Self {
        Self {
            start_seconds,
            end_seconds,
            penalty_minutes,
        }
    }

    /// Whether `[start, end]` lies entirely within this break.
    pub const fn contains(&self, start_seconds: u32, end_seconds: u32) -> bool {
        start_seconds >= self.start_seconds && end_seconds <= self.end_seconds
    }

    /// Whether the break is over at `seconds`.
    pub const fn has_ended_by(&self, seconds: u32) -> bool {
        seconds > self.end_seconds
    }

    pub fn penalty_hours(&self) -> f64 {
        f64::from(self.penalty_minutes) / 60.0
    }
}

impl fmt::Display for BreakInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hm = |s: u32| (s / 3600, (s % 3600) / 60);
        let (sh, sm) = hm(self.start_seconds);
        let (eh, em) = hm(self.end_seconds);
        write!(f, "{sh:02}:{sm:02}-{eh:02}:{em:02}")
    }
}

/// How breaks reduce a span of working time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakStrategy {
    /// Zero the span if it sits entirely inside any break.
    Exclusion,
    /// Deduct the penalty of every break that has ended before the span ends.
    Subtraction,
}

impl BreakStrategy {
    /// Applies the strategy to a span of `gross_hours` running from
    /// `start_seconds` to `end_seconds`.
    pub fn apply(
        self,
        breaks: &[BreakInterval],
        start_seconds: u32,
        end_seconds: u32,
        gross_hours: f64,
    ) -> f64 {
        match self {
            Self::Exclusion => {
                if breaks
                    .iter()
                    .any(|interval| interval.contains(start_seconds, end_seconds))
                {
                    0.0
                } else {
                    gross_hours
                }
            }
            Self::Subtraction => {
                let penalty: f64 = breaks
                    .iter()
                    .filter(|interval| interval.has_ended_by(end_seconds))
                    .map(BreakInterval::penalty_hours)
                    .sum();
                gross_hours - penalty
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::WorkingHoursPolicy;

    fn breaks() -> Vec<BreakInterval> {
        WorkingHoursPolicy::default().breaks
    }

    #[test]
    fn exclusion_drops_span_inside_break() {
        // 10:31-10:39
        let net = BreakStrategy::Exclusion.apply(&breaks(), 37_860, 38_340, 0.13);
        assert!(net.abs() < f64::EPSILON);
    }

    #[test]
    fn exclusion_keeps_span_straddling_break() {
        // 10:25-10:45
        let gross = 1200.0 / 3600.0;
        let net = BreakStrategy::Exclusion.apply(&breaks(), 37_500, 38_700, gross);
        assert!((net - gross).abs() < f64::EPSILON);
    }

    #[test]
    fn exclusion_matches_break_boundaries_inclusively() {
        let net = BreakStrategy::Exclusion.apply(&breaks(), 48_000, 50_400, 0.67);
        assert!(net.abs() < f64::EPSILON);
    }

    #[test]
    fn subtraction_charges_only_finished_breaks() {
        // Span ends at 15:00: first two breaks are over, the third is not.
        let net = BreakStrategy::Subtraction.apply(&breaks(), 30_300, 54_000, 6.0);
        assert!((net - (6.0 - 10.0 / 60.0 - 40.0 / 60.0)).abs() < 1e-9);
    }

    #[test]
    fn subtraction_waits_until_break_end_has_passed() {
        // Exactly at 10:40 the first break has not been charged yet.
        let net = BreakStrategy::Subtraction.apply(&breaks(), 30_300, 38_400, 2.0);
        assert!((net - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn subtraction_uses_configured_penalties() {
        let custom = [BreakInterval::new(37_800, 38_400, 25)];
        let net = BreakStrategy::Subtraction.apply(&custom, 30_300, 40_000, 3.0);
        assert!((net - (3.0 - 25.0 / 60.0)).abs() < 1e-9);
    }

    #[test]
    fn display_formats_clock_times() {
        assert_eq!(BreakInterval::new(48_000, 50_400, 40).to_string(), "13:20-14:00");
    }
}
