//! Machine log entries as read back from storage.

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::types::{LineNumber, MachineId, Mode, OperatorId};

/// Converts a time of day into whole seconds since midnight.
pub fn seconds_of_day(time: NaiveTime) -> u32 {
    time.hour() * 3600 + time.minute() * 60 + time.second()
}

/// One machine event: a span of time spent in a single mode.
///
/// Start and end are times on the same calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub machine_id: MachineId,
    pub line_number: LineNumber,
    pub operator_id: OperatorId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub mode: Mode,
    pub stitch_count: u64,
    /// Seconds the needle was moving.
    pub needle_runtime: f64,
    /// Seconds the needle was stopped.
    #[serde(default)]
    pub needle_stoptime: f64,
    /// Free-form field the firmware uses for instantaneous sewing speed.
    #[serde(default)]
    pub reserve: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_log_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub str_log_id: Option<i64>,
}

impl LogRecord {
    pub fn start_seconds(&self) -> u32 {
        seconds_of_day(self.start_time)
    }

    pub fn end_seconds(&self) -> u32 {
        seconds_of_day(self.end_time)
    }

    /// Reserve field parsed as an integer speed, `None` if it is not numeric.
    pub fn reserve_numeric(&self) -> Option<i64> {
        self.reserve.trim().parse().ok()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Builds a record on `date` from `HH:MM` strings.
    pub fn record(date: &str, start: &str, end: &str, mode: Mode) -> LogRecord {
        LogRecord {
            machine_id: MachineId::new("M1").unwrap(),
            line_number: LineNumber::new("1").unwrap(),
            operator_id: OperatorId::new("OP1").unwrap(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            start_time: NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
            end_time: NaiveTime::parse_from_str(end, "%H:%M").unwrap(),
            mode,
            stitch_count: 0,
            needle_runtime: 0.0,
            needle_stoptime: 0.0,
            reserve: String::new(),
            tx_log_id: None,
            str_log_id: None,
        }
    }
}
