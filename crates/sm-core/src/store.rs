//! Collaborator seams: where logs come from, where they go, and who the
//! operators are.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, StoreError};
use crate::ingest::DuplicateKey;
use crate::record::LogRecord;
use crate::types::{LineNumber, MachineId, OperatorId, parse_date};

/// Display name used when an operator id is not in the directory.
pub const UNKNOWN_OPERATOR: &str = "Unknown";

/// The kinds of entity a log can be attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Operator,
    Machine,
    Line,
}

impl EntityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::Machine => "machine",
            Self::Line => "line",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Restricts a fetch to one entity, or to none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityFilter {
    All,
    Operator(OperatorId),
    Machine(MachineId),
    Line(LineNumber),
}

/// Inclusive date bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub const fn unbounded() -> Self {
        Self {
            from: None,
            to: None,
        }
    }

    /// Parses optional `YYYY-MM-DD` bounds. Blank strings count as absent.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, EngineError> {
        let bound = |value: Option<&str>| -> Result<Option<NaiveDate>, EngineError> {
            match value.map(str::trim).filter(|v| !v.is_empty()) {
                Some(v) => Ok(Some(parse_date(v)?)),
                None => Ok(None),
            }
        };
        Ok(Self {
            from: bound(from)?,
            to: bound(to)?,
        })
    }

    /// Fails unless both bounds are present.
    pub fn require_both(self) -> Result<(NaiveDate, NaiveDate), EngineError> {
        let from = self.from.ok_or(EngineError::MissingRequiredField { field: "from_date" })?;
        let to = self.to.ok_or(EngineError::MissingRequiredField { field: "to_date" })?;
        Ok((from, to))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

/// Query passed to [`LogStore::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub entity: EntityFilter,
    pub range: DateRange,
}

impl LogFilter {
    pub const fn new(entity: EntityFilter, range: DateRange) -> Self {
        Self { entity, range }
    }
}

/// Read-only access to stored machine logs.
pub trait LogStore {
    /// Returns the logs matching `filter`, in no particular order.
    fn fetch(&self, filter: &LogFilter) -> Result<Vec<LogRecord>, StoreError>;

    /// Lists the distinct ids of `kind` that have logs within `range`, sorted.
    fn distinct_ids(&self, kind: EntityKind, range: &DateRange) -> Result<Vec<String>, StoreError>;

    /// Whether any log, on any date, is attributed to `id`.
    fn has_logs(&self, kind: EntityKind, id: &str) -> Result<bool, StoreError> {
        Ok(self
            .distinct_ids(kind, &DateRange::unbounded())?
            .iter()
            .any(|known| known == id))
    }
}

/// Ids of `kind` active between two required dates.
///
/// The unassigned operator card is never listed.
pub fn active_ids<S>(store: &S, kind: EntityKind, range: &DateRange) -> Result<Vec<String>, EngineError>
where
    S: LogStore + ?Sized,
{
    range.require_both()?;
    let mut ids = store.distinct_ids(kind, range).map_err(EngineError::store)?;
    if kind == EntityKind::Operator {
        ids.retain(|id| id != "0");
    }
    Ok(ids)
}

/// An operator known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: OperatorId,
    pub name: String,
}

/// Maps operator card numbers to display names.
pub trait OperatorDirectory {
    fn lookup(&self, id: &OperatorId) -> Result<Option<Operator>, StoreError>;

    fn find_by_name(&self, name: &str) -> Result<Option<Operator>, StoreError>;

    /// Every operator, ordered by id.
    fn list(&self) -> Result<Vec<Operator>, StoreError>;

    /// Display name for `id`, or [`UNKNOWN_OPERATOR`].
    fn resolve_name(&self, id: &OperatorId) -> Result<String, StoreError> {
        Ok(self
            .lookup(id)?
            .map_or_else(|| UNKNOWN_OPERATOR.to_string(), |operator| operator.name))
    }

    fn contains(&self, id: &OperatorId) -> Result<bool, StoreError> {
        Ok(self.lookup(id)?.is_some())
    }
}

/// Write side used by ingestion.
pub trait LogSink {
    /// Whether a log with the same canonical id and span already exists.
    fn contains_log(&self, key: &DuplicateKey) -> Result<bool, StoreError>;

    fn insert_log(&self, record: &LogRecord) -> Result<(), StoreError>;
}


#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    #[test]
    fn blank_bounds_are_open() {
        let range = DateRange::parse(Some(""), Some("  ")).unwrap();
        assert_eq!(range, DateRange::unbounded());
        assert!(range.contains(NaiveDate::from_ymd_opt(1999, 1, 1).unwrap()));
    }

    #[test]
    fn malformed_bound_is_rejected() {
        let err = DateRange::parse(Some("2025/01/01"), None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidDateFormat { value } if value == "2025/01/01"));
    }

    #[test]
    fn range_is_inclusive() {
        let range = DateRange::parse(Some("2025-01-06"), Some("2025-01-07")).unwrap();
        let day = |d| NaiveDate::from_ymd_opt(2025, 1, d).unwrap();
        assert!(!range.contains(day(5)));
        assert!(range.contains(day(6)));
        assert!(range.contains(day(7)));
        assert!(!range.contains(day(8)));
    }

    #[test]
    fn require_both_names_the_missing_bound() {
        let range = DateRange::parse(Some("2025-01-06"), None).unwrap();
        let err = range.require_both().unwrap_err();
        assert!(matches!(
            err,
            EngineError::MissingRequiredField { field: "to_date" }
        ));
    }

    #[test]
    fn active_ids_need_both_dates_and_hide_unassigned() {
        use crate::record::fixtures::record;
        use crate::types::Mode;

        let mut unassigned = record("2025-01-06", "09:00", "10:00", Mode::Idle);
        unassigned.operator_id = OperatorId::new("0").unwrap();
        let store = MemoryStore::new(vec![
            record("2025-01-06", "09:00", "10:00", Mode::Sewing),
            unassigned,
        ]);

        let open = DateRange::parse(Some("2025-01-01"), None).unwrap();
        assert!(matches!(
            active_ids(&store, EntityKind::Machine, &open),
            Err(EngineError::MissingRequiredField { .. })
        ));

        let range = DateRange::parse(Some("2025-01-01"), Some("2025-01-31")).unwrap();
        assert_eq!(
            active_ids(&store, EntityKind::Operator, &range).unwrap(),
            vec!["OP1".to_string()]
        );
        assert_eq!(
            active_ids(&store, EntityKind::Machine, &range).unwrap(),
            vec!["M1".to_string()]
        );
    }

    #[test]
    fn resolve_name_falls_back_to_unknown() {
        let directory = MemoryStore::default().with_operator("A17", "Asha");
        let known = OperatorId::new("A17").unwrap();
        let missing = OperatorId::new("B2").unwrap();
        assert_eq!(directory.resolve_name(&known).unwrap(), "Asha");
        assert_eq!(directory.resolve_name(&missing).unwrap(), UNKNOWN_OPERATOR);
        assert!(!directory.contains(&missing).unwrap());
    }
}
