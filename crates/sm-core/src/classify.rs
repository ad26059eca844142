//! Per-record duration classification.

use crate::breaks::BreakStrategy;
use crate::policy::WorkingHoursPolicy;
use crate::record::LogRecord;

/// A log record with its eligible duration worked out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifiedRecord<'a> {
    pub record: &'a LogRecord,
    /// Hours inside the working window, zero if excluded by a break.
    pub duration_hours: f64,
    /// Reserve field as a speed reading, present only when positive.
    pub speed: Option<f64>,
}

/// Working-window hours of a single record after break exclusion.
pub fn duration_hours(policy: &WorkingHoursPolicy, record: &LogRecord) -> f64 {
    let start = record.start_seconds();
    let end = record.end_seconds();
    let gross = policy.clipped_hours(start, end);
    BreakStrategy::Exclusion.apply(&policy.breaks, start, end, gross)
}

/// Classifies records and keeps those with a positive duration.
#[allow(clippy::cast_precision_loss)]
pub fn classify<'a, I>(policy: &WorkingHoursPolicy, records: I) -> Vec<ClassifiedRecord<'a>>
where
    I: IntoIterator<Item = &'a LogRecord>,
{
    records
        .into_iter()
        .filter_map(|record| {
            let duration_hours = duration_hours(policy, record);
            (duration_hours > 0.0).then(|| ClassifiedRecord {
                record,
                duration_hours,
                speed: record
                    .reserve_numeric()
                    .filter(|&speed| speed > 0)
                    .map(|speed| speed as f64),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::record;
    use crate::types::Mode;

    #[test]
    fn records_outside_window_are_dropped() {
        let policy = WorkingHoursPolicy::default();
        let logs = [
            record("2025-01-06", "06:00", "08:00", Mode::Sewing),
            record("2025-01-06", "19:40", "21:00", Mode::Sewing),
            record("2025-01-06", "09:00", "10:00", Mode::Sewing),
        ];
        let classified = classify(&policy, &logs);
        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].record.start_time, logs[2].start_time);
    }

    #[test]
    fn early_record_is_clipped() {
        let policy = WorkingHoursPolicy::default();
        let log = record("2025-01-06", "08:00", "09:00", Mode::Sewing);
        let hours = duration_hours(&policy, &log);
        assert!((hours - 35.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn record_inside_break_is_excluded_but_straddling_is_kept() {
        let policy = WorkingHoursPolicy::default();
        let inside = record("2025-01-06", "10:31", "10:39", Mode::Sewing);
        let straddling = record("2025-01-06", "10:25", "10:45", Mode::Sewing);

        assert!(duration_hours(&policy, &inside).abs() < f64::EPSILON);
        assert!((duration_hours(&policy, &straddling) - 20.0 / 60.0).abs() < 1e-9);

        let logs = [inside, straddling];
        let classified = classify(&policy, &logs);
        assert_eq!(classified.len(), 1);
    }

    #[test]
    fn speed_ignores_non_numeric_and_non_positive_reserve() {
        let policy = WorkingHoursPolicy::default();
        let mut logs = vec![
            record("2025-01-06", "09:00", "10:00", Mode::Sewing),
            record("2025-01-06", "10:00", "10:20", Mode::Sewing),
            record("2025-01-06", "11:00", "12:00", Mode::Sewing),
        ];
        logs[0].reserve = "1500".to_string();
        logs[1].reserve = "0".to_string();
        logs[2].reserve = "n/a".to_string();

        let speeds: Vec<_> = classify(&policy, &logs)
            .iter()
            .map(|classified| classified.speed)
            .collect();
        assert_eq!(speeds, vec![Some(1500.0), None, None]);
    }
}
