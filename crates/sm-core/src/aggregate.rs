//! Mode aggregation over classified records.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::classify::ClassifiedRecord;
use crate::types::{MachineId, Mode};

/// Accumulated hours and counters for one grouping key.
///
/// Values are kept at full precision; rounding happens when a report is
/// presented.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModeTotals {
    pub sewing_hours: f64,
    /// Hours logged in mode 2. Only some report profiles trust this.
    pub logged_idle_hours: f64,
    pub no_feeding_hours: f64,
    pub meeting_hours: f64,
    pub maintenance_hours: f64,
    pub stitch_count: u64,
    pub sewing_stitch_count: u64,
    /// Needle runtime across every mode, in seconds.
    pub needle_runtime: f64,
    /// Needle runtime of sewing records only, in seconds.
    pub sewing_needle_runtime: f64,
    pub sewing_records: usize,
    pub records: usize,
    pub dates: BTreeSet<NaiveDate>,
    pub machines: BTreeSet<MachineId>,
    speed_sum: f64,
    speed_samples: usize,
}

impl ModeTotals {
    /// Folds classified records into a single total.
    pub fn from_records<'r, 'a: 'r, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'r ClassifiedRecord<'a>>,
    {
        let mut totals = Self::default();
        for record in records {
            totals.add(record);
        }
        totals
    }

    pub fn add(&mut self, classified: &ClassifiedRecord<'_>) {
        let record = classified.record;
        let hours = classified.duration_hours;
        match record.mode {
            Mode::Sewing => {
                self.sewing_hours += hours;
                self.sewing_stitch_count += record.stitch_count;
                self.sewing_needle_runtime += record.needle_runtime;
                self.sewing_records += 1;
            }
            Mode::Idle => self.logged_idle_hours += hours,
            Mode::NoFeeding => self.no_feeding_hours += hours,
            Mode::Meeting => self.meeting_hours += hours,
            Mode::Maintenance => self.maintenance_hours += hours,
        }
        self.stitch_count += record.stitch_count;
        self.needle_runtime += record.needle_runtime;
        self.records += 1;
        self.dates.insert(record.date);
        self.machines.insert(record.machine_id.clone());
        if let Some(speed) = classified.speed {
            self.speed_sum += speed;
            self.speed_samples += 1;
        }
    }

    /// No feeding, meeting and maintenance hours.
    pub fn stoppage_hours(&self) -> f64 {
        self.no_feeding_hours + self.meeting_hours + self.maintenance_hours
    }

    /// Every hour with an explicit non-idle mode.
    pub fn accounted_hours(&self) -> f64 {
        self.sewing_hours + self.stoppage_hours()
    }

    /// Average positive sewing speed, zero without samples.
    #[allow(clippy::cast_precision_loss)]
    pub fn average_speed(&self) -> f64 {
        if self.speed_samples == 0 {
            0.0
        } else {
            self.speed_sum / self.speed_samples as f64
        }
    }

    /// Average needle runtime per sewing record, in seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn average_sewing_needle_runtime(&self) -> f64 {
        if self.sewing_records == 0 {
            0.0
        } else {
            self.sewing_needle_runtime / self.sewing_records as f64
        }
    }

    pub fn working_days(&self) -> usize {
        self.dates.len()
    }
}

/// Groups classified records by `key`, ordered by key.
pub fn group_by<'a, K, F>(records: &[ClassifiedRecord<'a>], key: F) -> BTreeMap<K, ModeTotals>
where
    K: Ord,
    F: Fn(&ClassifiedRecord<'a>) -> K,
{
    let mut groups: BTreeMap<K, ModeTotals> = BTreeMap::new();
    for record in records {
        groups.entry(key(record)).or_default().add(record);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::policy::WorkingHoursPolicy;
    use crate::record::fixtures::record;

    #[test]
    fn sums_hours_per_mode() {
        let policy = WorkingHoursPolicy::default();
        let mut logs = vec![
            record("2025-01-06", "09:00", "10:00", Mode::Sewing),
            record("2025-01-06", "11:00", "11:30", Mode::Sewing),
            record("2025-01-06", "12:00", "12:15", Mode::NoFeeding),
            record("2025-01-06", "12:15", "12:45", Mode::Meeting),
            record("2025-01-06", "15:00", "16:00", Mode::Maintenance),
            record("2025-01-06", "17:00", "17:30", Mode::Idle),
        ];
        logs[0].stitch_count = 400;
        logs[0].needle_runtime = 1800.0;
        logs[1].stitch_count = 100;
        logs[1].needle_runtime = 600.0;
        logs[5].needle_runtime = 30.0;

        let classified = classify(&policy, &logs);
        let totals = ModeTotals::from_records(&classified);

        assert!((totals.sewing_hours - 1.5).abs() < 1e-9);
        assert!((totals.no_feeding_hours - 0.25).abs() < 1e-9);
        assert!((totals.meeting_hours - 0.5).abs() < 1e-9);
        assert!((totals.maintenance_hours - 1.0).abs() < 1e-9);
        assert!((totals.logged_idle_hours - 0.5).abs() < 1e-9);
        assert!((totals.accounted_hours() - 3.25).abs() < 1e-9);
        assert_eq!(totals.stitch_count, 500);
        assert_eq!(totals.sewing_stitch_count, 500);
        assert!((totals.needle_runtime - 2430.0).abs() < 1e-9);
        assert!((totals.sewing_needle_runtime - 2400.0).abs() < 1e-9);
        assert!((totals.average_sewing_needle_runtime() - 1200.0).abs() < 1e-9);
        assert_eq!(totals.records, 6);
        assert_eq!(totals.working_days(), 1);
    }

    #[test]
    fn average_speed_uses_positive_readings_only() {
        let policy = WorkingHoursPolicy::default();
        let mut logs = vec![
            record("2025-01-06", "09:00", "10:00", Mode::Sewing),
            record("2025-01-06", "10:00", "10:20", Mode::Sewing),
            record("2025-01-06", "11:00", "12:00", Mode::Sewing),
        ];
        logs[0].reserve = "1000".to_string();
        logs[1].reserve = "2000".to_string();
        logs[2].reserve = "-".to_string();

        let classified = classify(&policy, &logs);
        let totals = ModeTotals::from_records(&classified);
        assert!((totals.average_speed() - 1500.0).abs() < 1e-9);

        assert!(ModeTotals::default().average_speed().abs() < f64::EPSILON);
    }

    #[test]
    fn group_by_date_orders_keys() {
        let policy = WorkingHoursPolicy::default();
        let logs = vec![
            record("2025-01-07", "09:00", "10:00", Mode::Sewing),
            record("2025-01-06", "09:00", "10:00", Mode::Sewing),
            record("2025-01-07", "11:00", "12:00", Mode::Meeting),
        ];
        let classified = classify(&policy, &logs);
        let groups = group_by(&classified, |c| c.record.date);

        let dates: Vec<_> = groups.keys().map(ToString::to_string).collect();
        assert_eq!(dates, vec!["2025-01-06", "2025-01-07"]);
        let second = groups.values().nth(1).unwrap();
        assert_eq!(second.records, 2);
        assert!((second.meeting_hours - 1.0).abs() < 1e-9);
    }
}
