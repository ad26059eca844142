//! Validating and storing device submissions.
//!
//! Devices retransmit. A retransmitted log carries its original id plus a
//! fixed offset, so ingestion maps every submitted id back to a canonical id
//! and checks whether a log with that id and the same span is already stored.
//! A match is acknowledged without inserting anything.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::record::LogRecord;
use crate::store::LogSink;
use crate::types::{LineNumber, MachineId, Mode, OperatorId, parse_date};

/// A JSON scalar the firmware may send as either a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl LooseValue {
    /// Integer reading; text is trimmed and parsed strictly.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Float(_) => None,
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl fmt::Display for LooseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// One log as posted by a machine, field names as on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSubmission {
    #[serde(rename = "MACHINE_ID", default)]
    pub machine_id: Option<LooseValue>,
    #[serde(rename = "LINE_NUMB", default)]
    pub line_number: Option<LooseValue>,
    #[serde(rename = "OPERATOR_ID", default)]
    pub operator_id: Option<LooseValue>,
    #[serde(rename = "DATE", default)]
    pub date: Option<String>,
    #[serde(rename = "START_TIME", default)]
    pub start_time: Option<String>,
    #[serde(rename = "END_TIME", default)]
    pub end_time: Option<String>,
    #[serde(rename = "MODE", default)]
    pub mode: Option<LooseValue>,
    #[serde(rename = "STITCH_COUNT", default)]
    pub stitch_count: u64,
    #[serde(rename = "NEEDLE_RUNTIME", default)]
    pub needle_runtime: f64,
    #[serde(rename = "NEEDLE_STOPTIME", default)]
    pub needle_stoptime: f64,
    #[serde(rename = "RESERVE", default)]
    pub reserve: Option<LooseValue>,
    #[serde(rename = "Tx_LOGID", default)]
    pub tx_log_id: Option<LooseValue>,
    #[serde(rename = "Str_LOGID", default)]
    pub str_log_id: Option<LooseValue>,
}

/// Retransmission offset rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestPolicy {
    /// Ids above this value are retransmissions.
    pub threshold: i64,
    /// Subtracted from a retransmitted id to recover the canonical id.
    pub offset: i64,
}

impl Default for IngestPolicy {
    fn default() -> Self {
        Self {
            threshold: 1000,
            offset: 1000,
        }
    }
}

impl IngestPolicy {
    pub const fn canonical_id(&self, id: i64) -> i64 {
        if id > self.threshold { id - self.offset } else { id }
    }
}

/// Which of the two device log counters an id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogIdField {
    Tx,
    Str,
}

impl LogIdField {
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Tx => "Tx_LOGID",
            Self::Str => "Str_LOGID",
        }
    }
}

/// Identity of a stored log for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    pub field: LogIdField,
    pub log_id: i64,
    pub machine_id: MachineId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Result of a successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Inserted,
    /// Already stored; nothing was written.
    Duplicate,
}

fn required<'v, T>(value: Option<&'v T>, field: &'static str) -> Result<&'v T, EngineError> {
    value.ok_or(EngineError::MissingRequiredField { field })
}

fn parse_time(value: &str, field: &'static str) -> Result<NaiveTime, EngineError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| EngineError::InvalidFieldFormat {
            field,
            value: value.to_string(),
        })
}

fn log_id(
    value: Option<&LooseValue>,
    field: LogIdField,
    policy: &IngestPolicy,
) -> Result<Option<i64>, EngineError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.as_integer() {
        Some(id) if id >= 0 => Ok(Some(policy.canonical_id(id))),
        _ => Err(EngineError::InvalidLogId {
            field: field.wire_name(),
            value: value.to_string(),
        }),
    }
}

impl LogSubmission {
    /// Validates the submission into a storable record with canonical ids.
    pub fn validate(&self, policy: &IngestPolicy) -> Result<LogRecord, EngineError> {
        let raw_mode = required(self.mode.as_ref(), "MODE")?;
        let code = raw_mode
            .as_integer()
            .ok_or_else(|| EngineError::InvalidFieldFormat {
                field: "MODE",
                value: raw_mode.to_string(),
            })?;
        let mode = Mode::try_from(code)?;

        let machine_id = MachineId::new(required(self.machine_id.as_ref(), "MACHINE_ID")?.to_string())?;
        let line_number = LineNumber::new(required(self.line_number.as_ref(), "LINE_NUMB")?.to_string())?;
        let operator_id = OperatorId::new(required(self.operator_id.as_ref(), "OPERATOR_ID")?.to_string())?;
        let date = parse_date(required(self.date.as_ref(), "DATE")?.trim())?;
        let start_time = parse_time(required(self.start_time.as_ref(), "START_TIME")?, "START_TIME")?;
        let end_time = parse_time(required(self.end_time.as_ref(), "END_TIME")?, "END_TIME")?;

        if !self.needle_runtime.is_finite() || self.needle_runtime < 0.0 {
            return Err(EngineError::InvalidFieldFormat {
                field: "NEEDLE_RUNTIME",
                value: self.needle_runtime.to_string(),
            });
        }
        if !self.needle_stoptime.is_finite() || self.needle_stoptime < 0.0 {
            return Err(EngineError::InvalidFieldFormat {
                field: "NEEDLE_STOPTIME",
                value: self.needle_stoptime.to_string(),
            });
        }

        Ok(LogRecord {
            machine_id,
            line_number,
            operator_id,
            date,
            start_time,
            end_time,
            mode,
            stitch_count: self.stitch_count,
            needle_runtime: self.needle_runtime,
            needle_stoptime: self.needle_stoptime,
            reserve: self
                .reserve
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            tx_log_id: log_id(self.tx_log_id.as_ref(), LogIdField::Tx, policy)?,
            str_log_id: log_id(self.str_log_id.as_ref(), LogIdField::Str, policy)?,
        })
    }
}

/// Validates `submission` and stores it unless an equivalent log exists.
///
/// The transmit and storage counters are checked independently; a match on
/// either one is a duplicate.
pub fn ingest<S>(
    sink: &S,
    submission: &LogSubmission,
    policy: &IngestPolicy,
) -> Result<IngestOutcome, EngineError>
where
    S: LogSink + ?Sized,
{
    let record = submission.validate(policy)?;

    for (field, id) in [
        (LogIdField::Tx, record.tx_log_id),
        (LogIdField::Str, record.str_log_id),
    ] {
        let Some(log_id) = id else { continue };
        let key = DuplicateKey {
            field,
            log_id,
            machine_id: record.machine_id.clone(),
            date: record.date,
            start_time: record.start_time,
            end_time: record.end_time,
        };
        if sink.contains_log(&key).map_err(EngineError::store)? {
            tracing::debug!(
                machine_id = %record.machine_id,
                field = field.wire_name(),
                log_id,
                "duplicate log acknowledged"
            );
            return Ok(IngestOutcome::Duplicate);
        }
    }

    sink.insert_log(&record).map_err(EngineError::store)?;
    tracing::debug!(machine_id = %record.machine_id, date = %record.date, "log stored");
    Ok(IngestOutcome::Inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn submission(json: &str) -> LogSubmission {
        serde_json::from_str(json).unwrap()
    }

    const BASE: &str = r#"{
        "MACHINE_ID": "M7",
        "LINE_NUMB": 3,
        "OPERATOR_ID": "A17",
        "DATE": "2025-01-06",
        "START_TIME": "09:00:00",
        "END_TIME": "09:15:00",
        "MODE": 1,
        "STITCH_COUNT": 420,
        "NEEDLE_RUNTIME": 600,
        "NEEDLE_STOPTIME": 300,
        "RESERVE": "1500",
        "Tx_LOGID": 1005
    }"#;

    #[test]
    fn validates_device_payload() {
        let record = submission(BASE).validate(&IngestPolicy::default()).unwrap();
        assert_eq!(record.machine_id.as_str(), "M7");
        assert_eq!(record.line_number.as_str(), "3");
        assert_eq!(record.mode, Mode::Sewing);
        assert_eq!(record.reserve, "1500");
        assert_eq!(record.tx_log_id, Some(5));
        assert_eq!(record.str_log_id, None);
        assert!((record.needle_stoptime - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn retransmission_is_acknowledged_without_insert() {
        let store = MemoryStore::default();
        let policy = IngestPolicy::default();

        let mut first = submission(BASE);
        first.tx_log_id = Some(LooseValue::Integer(5));
        assert_eq!(ingest(&store, &first, &policy).unwrap(), IngestOutcome::Inserted);

        let retransmitted = submission(BASE);
        assert_eq!(
            ingest(&store, &retransmitted, &policy).unwrap(),
            IngestOutcome::Duplicate
        );
        assert_eq!(store.logs.borrow().len(), 1);
    }

    #[test]
    fn same_id_with_different_span_is_inserted() {
        let store = MemoryStore::default();
        let policy = IngestPolicy::default();
        ingest(&store, &submission(BASE), &policy).unwrap();

        let mut later = submission(BASE);
        later.start_time = Some("09:15:00".to_string());
        later.end_time = Some("09:30:00".to_string());
        assert_eq!(ingest(&store, &later, &policy).unwrap(), IngestOutcome::Inserted);
        assert_eq!(store.logs.borrow().len(), 2);
    }

    #[test]
    fn str_counter_is_checked_independently() {
        let store = MemoryStore::default();
        let policy = IngestPolicy::default();

        let mut first = submission(BASE);
        first.tx_log_id = None;
        first.str_log_id = Some(LooseValue::Text("12".to_string()));
        ingest(&store, &first, &policy).unwrap();

        let mut again = submission(BASE);
        again.tx_log_id = Some(LooseValue::Integer(99));
        again.str_log_id = Some(LooseValue::Integer(1012));
        assert_eq!(ingest(&store, &again, &policy).unwrap(), IngestOutcome::Duplicate);
    }

    #[test]
    fn rejects_unknown_mode() {
        let mut bad = submission(BASE);
        bad.mode = Some(LooseValue::Integer(9));
        let err = bad.validate(&IngestPolicy::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidMode { value: 9 }));

        bad.mode = Some(LooseValue::Text("sewing".to_string()));
        let err = bad.validate(&IngestPolicy::default()).unwrap_err();
        assert_eq!(err.to_string(), "invalid MODE format: sewing");
    }

    #[test]
    fn rejects_malformed_log_id() {
        let mut bad = submission(BASE);
        bad.tx_log_id = Some(LooseValue::Text("abc".to_string()));
        let err = bad.validate(&IngestPolicy::default()).unwrap_err();
        assert_eq!(err.to_string(), "invalid Tx_LOGID format: abc");

        bad.tx_log_id = Some(LooseValue::Integer(-4));
        assert!(matches!(
            bad.validate(&IngestPolicy::default()).unwrap_err(),
            EngineError::InvalidLogId { field: "Tx_LOGID", .. }
        ));
    }

    #[test]
    fn reports_missing_fields_by_wire_name() {
        let mut bad = submission(BASE);
        bad.machine_id = None;
        let err = bad.validate(&IngestPolicy::default()).unwrap_err();
        assert_eq!(err.to_string(), "MACHINE_ID is required");

        let mut bad = submission(BASE);
        bad.date = Some("06-01-2025".to_string());
        assert!(matches!(
            bad.validate(&IngestPolicy::default()).unwrap_err(),
            EngineError::InvalidDateFormat { .. }
        ));
    }

    #[test]
    fn canonical_id_only_shifts_above_threshold() {
        let policy = IngestPolicy::default();
        assert_eq!(policy.canonical_id(1000), 1000);
        assert_eq!(policy.canonical_id(1001), 1);
    }
}
