//! Filtered log listings with a per-mode summary.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::aggregate::ModeTotals;
use crate::classify::classify;
use crate::error::EngineError;
use crate::policy::WorkingHoursPolicy;
use crate::record::LogRecord;
use crate::report::{ReportEngine, percentage, round2};
use crate::store::{DateRange, EntityFilter, LogStore, OperatorDirectory};
use crate::types::{LineNumber, MachineId, Mode, OperatorId};

/// Which logs to list.
///
/// Values of one kind are alternatives; kinds combine. An empty list does
/// not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSelection {
    pub machines: Vec<MachineId>,
    pub lines: Vec<LineNumber>,
    /// Display names or card numbers.
    pub operators: Vec<String>,
    pub range: DateRange,
}

impl LogSelection {
    /// The narrowest single-entity filter the store can apply itself.
    fn store_filter(&self) -> EntityFilter {
        match (self.machines.as_slice(), self.lines.as_slice()) {
            ([machine], _) => EntityFilter::Machine(machine.clone()),
            (_, [line]) => EntityFilter::Line(line.clone()),
            _ => EntityFilter::All,
        }
    }

    fn admits(&self, record: &LogRecord, operators: Option<&BTreeSet<OperatorId>>) -> bool {
        (self.machines.is_empty() || self.machines.contains(&record.machine_id))
            && (self.lines.is_empty() || self.lines.contains(&record.line_number))
            && operators.is_none_or(|ids| ids.contains(&record.operator_id))
    }
}

/// Hours per mode and totals over a set of logs.
///
/// Hours only cover the part of each log inside the working window, after
/// break exclusion. Percentages are taken over the logged total.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogSummary {
    pub total_logs: usize,
    pub sewing_hours: f64,
    pub idle_hours: f64,
    pub meeting_hours: f64,
    pub no_feeding_hours: f64,
    pub maintenance_hours: f64,
    pub total_hours: f64,
    pub total_stitch_count: u64,
    /// Seconds, every mode.
    pub total_needle_runtime: f64,
    pub productive_percent: f64,
    pub npt_percent: f64,
    /// Sewing stitches per second of sewing needle runtime.
    pub sewing_speed: f64,
}

impl LogSummary {
    pub fn from_records(policy: &WorkingHoursPolicy, records: &[LogRecord]) -> Self {
        let classified = classify(policy, records);
        let totals = ModeTotals::from_records(&classified);

        let total_hours = totals.accounted_hours() + totals.logged_idle_hours;
        let non_production = totals.stoppage_hours() + totals.logged_idle_hours;
        #[allow(clippy::cast_precision_loss)]
        let sewing_speed = if totals.sewing_needle_runtime > 0.0 {
            totals.sewing_stitch_count as f64 / totals.sewing_needle_runtime
        } else {
            0.0
        };

        Self {
            total_logs: records.len(),
            sewing_hours: round2(totals.sewing_hours),
            idle_hours: round2(totals.logged_idle_hours),
            meeting_hours: round2(totals.meeting_hours),
            no_feeding_hours: round2(totals.no_feeding_hours),
            maintenance_hours: round2(totals.maintenance_hours),
            total_hours: round2(total_hours),
            total_stitch_count: totals.stitch_count,
            total_needle_runtime: round2(totals.needle_runtime),
            productive_percent: round2(percentage(totals.sewing_hours, total_hours)),
            npt_percent: round2(percentage(non_production, total_hours)),
            sewing_speed: round2(sewing_speed),
        }
    }

    /// Hours per mode, in device-code order.
    pub fn mode_hours(&self) -> [(Mode, f64); 5] {
        [
            (Mode::Sewing, self.sewing_hours),
            (Mode::Idle, self.idle_hours),
            (Mode::NoFeeding, self.no_feeding_hours),
            (Mode::Meeting, self.meeting_hours),
            (Mode::Maintenance, self.maintenance_hours),
        ]
    }
}

/// Selected logs, ordered by date and start time, with their summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedLogs {
    pub summary: LogSummary,
    pub logs: Vec<LogRecord>,
}

impl<S, D> ReportEngine<'_, S, D>
where
    S: LogStore + ?Sized,
    D: OperatorDirectory + ?Sized,
{
    /// Lists the logs matching `selection` and summarizes them.
    ///
    /// Operators are matched against the directory by display name or card
    /// number. Values that match nobody select no logs.
    pub fn consolidated_logs(&self, selection: &LogSelection) -> Result<ConsolidatedLogs, EngineError> {
        let operators = if selection.operators.is_empty() {
            None
        } else {
            let wanted: BTreeSet<&str> = selection.operators.iter().map(|value| value.trim()).collect();
            let ids: BTreeSet<OperatorId> = self
                .directory()
                .list()
                .map_err(EngineError::store)?
                .into_iter()
                .filter(|o| wanted.contains(o.name.as_str()) || wanted.contains(o.id.as_str()))
                .map(|o| o.id)
                .collect();
            tracing::debug!(requested = wanted.len(), matched = ids.len(), "resolved operator filter");
            Some(ids)
        };

        let mut logs = self.fetch(selection.store_filter(), &selection.range)?;
        logs.retain(|record| selection.admits(record, operators.as_ref()));
        logs.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));

        Ok(ConsolidatedLogs {
            summary: LogSummary::from_records(self.policy(), &logs),
            logs,
        })
    }
}
