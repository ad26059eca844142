//! Clipping log spans to the working-hours window.

use crate::policy::WorkingHoursPolicy;

/// A span clamped into `[day_start, day_end]`, in seconds since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClippedSpan {
    pub start_seconds: u32,
    pub end_seconds: u32,
}

impl ClippedSpan {
    /// Length in hours; reversed spans count as zero.
    pub fn hours(&self) -> f64 {
        f64::from(self.end_seconds.saturating_sub(self.start_seconds)) / 3600.0
    }
}

impl WorkingHoursPolicy {
    /// Clamps a span into the working window.
    ///
    /// Returns `None` when the span ends at or before the window opens or
    /// starts at or after it closes.
    pub fn clip(&self, start_seconds: u32, end_seconds: u32) -> Option<ClippedSpan> {
        if end_seconds <= self.day_start_seconds || start_seconds >= self.day_end_seconds {
            return None;
        }
        let clamp = |s: u32| s.clamp(self.day_start_seconds, self.day_end_seconds);
        Some(ClippedSpan {
            start_seconds: clamp(start_seconds),
            end_seconds: clamp(end_seconds),
        })
    }

    /// Hours of a span that fall inside the working window.
    pub fn clipped_hours(&self, start_seconds: u32, end_seconds: u32) -> f64 {
        self.clip(start_seconds, end_seconds)
            .map_or(0.0, |span| span.hours())
    }
}
