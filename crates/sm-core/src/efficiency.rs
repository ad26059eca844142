//! Shift efficiency and fleet counters.
//!
//! These work on raw logs. Nothing here is clipped to the working window,
//! and a span whose end is before its start is taken to cross midnight.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::record::{LogRecord, seconds_of_day};
use crate::report::{percentage, round2};
use crate::types::{LineNumber, MachineId, OperatorId};

/// Length of a standard shift, in seconds.
pub const STANDARD_SHIFT_SECONDS: u32 = 8 * 3600;

const SECONDS_PER_DAY: u32 = 86_400;

/// Seconds from `start` to `end`, wrapping past midnight.
pub fn span_seconds(start: NaiveTime, end: NaiveTime) -> u32 {
    let start = seconds_of_day(start);
    let mut end = seconds_of_day(end);
    if end < start {
        end += SECONDS_PER_DAY;
    }
    end - start
}

/// One log measured against a standard shift.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorEfficiency {
    pub operator_id: OperatorId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Worked time as a percentage of a standard shift.
    pub efficiency: f64,
}

/// Efficiency of each log, ordered by operator, date and start time.
pub fn operator_efficiency(records: &[LogRecord]) -> Vec<OperatorEfficiency> {
    let mut rows: Vec<OperatorEfficiency> = records
        .iter()
        .map(|r| OperatorEfficiency {
            operator_id: r.operator_id.clone(),
            date: r.date,
            start_time: r.start_time,
            end_time: r.end_time,
            efficiency: round2(percentage(
                f64::from(span_seconds(r.start_time, r.end_time)),
                f64::from(STANDARD_SHIFT_SECONDS),
            )),
        })
        .collect();
    rows.sort_by(|a, b| {
        (&a.operator_id, a.date, a.start_time).cmp(&(&b.operator_id, b.date, b.start_time))
    });
    rows
}

/// Needle utilization of one production line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineEfficiency {
    pub line_number: LineNumber,
    pub total_machines: usize,
    /// `runtime / (runtime + stoptime)` as a percentage.
    pub efficiency: f64,
}

#[derive(Default)]
struct LineAccumulator {
    machines: BTreeSet<MachineId>,
    runtime: f64,
    stoptime: f64,
}

/// Runtime share and machine count per line, ordered by line.
pub fn line_efficiency(records: &[LogRecord]) -> Vec<LineEfficiency> {
    let mut lines: BTreeMap<&LineNumber, LineAccumulator> = BTreeMap::new();
    for record in records {
        let line = lines.entry(&record.line_number).or_default();
        line.machines.insert(record.machine_id.clone());
        line.runtime += record.needle_runtime;
        line.stoptime += record.needle_stoptime;
    }
    lines
        .into_iter()
        .map(|(line_number, line)| LineEfficiency {
            line_number: line_number.clone(),
            total_machines: line.machines.len(),
            efficiency: round2(percentage(line.runtime, line.runtime + line.stoptime)),
        })
        .collect()
}

/// Headline counts for the whole fleet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FleetCounts {
    pub machines: usize,
    pub lines: usize,
    /// Distinct operators with any no-feeding, meeting or maintenance log.
    pub underperforming_operators: usize,
}

impl FleetCounts {
    pub fn from_records(records: &[LogRecord]) -> Self {
        let machines: BTreeSet<&MachineId> = records.iter().map(|r| &r.machine_id).collect();
        let lines: BTreeSet<&LineNumber> = records.iter().map(|r| &r.line_number).collect();
        let underperforming: BTreeSet<&OperatorId> = records
            .iter()
            .filter(|r| r.mode.is_stoppage())
            .map(|r| &r.operator_id)
            .collect();
        Self {
            machines: machines.len(),
            lines: lines.len(),
            underperforming_operators: underperforming.len(),
        }
    }
}
