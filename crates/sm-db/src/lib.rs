//! Storage layer for machine logs and the operator directory.
//!
//! Provides persistence using `rusqlite` and implements the collaborator
//! traits from `sm-core`.
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Reports fetch everything up front and only then fan out across threads, so a
//! single connection is enough.
//!
//! # Schema
//!
//! Dates are stored as TEXT `YYYY-MM-DD` and times of day as TEXT `HH:MM:SS`,
//! so lexicographic order matches chronological order. Modes are stored as
//! their device codes.

use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use sm_core::ingest::{DuplicateKey, LogIdField};
use sm_core::{
    DateRange, EntityFilter, EntityKind, LineNumber, LogFilter, LogRecord, LogSink, LogStore,
    MachineId, Mode, Operator, OperatorDirectory, OperatorId, StoreError,
};
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored row that no longer parses into a log record.
    #[error("invalid machine log {row_id}: {message}")]
    InvalidRow { row_id: i64, message: String },
    /// An operator card number or name that is blank.
    #[error("invalid operator: {0}")]
    InvalidOperator(#[from] sm_core::ValidationError),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A `machine_logs` row before domain validation.
struct RawLog {
    row_id: i64,
    machine_id: String,
    line_number: String,
    operator_id: String,
    date: String,
    start_time: String,
    end_time: String,
    mode: i64,
    stitch_count: u64,
    needle_runtime: f64,
    needle_stoptime: f64,
    reserve: String,
    tx_log_id: Option<i64>,
    str_log_id: Option<i64>,
}

impl RawLog {
    fn into_record(self) -> Result<LogRecord, DbError> {
        let row_id = self.row_id;
        let invalid = |message: String| DbError::InvalidRow { row_id, message };
        let time = |value: &str| {
            NaiveTime::parse_from_str(value, TIME_FORMAT)
                .map_err(|e| invalid(format!("time {value:?}: {e}")))
        };

        Ok(LogRecord {
            machine_id: MachineId::new(self.machine_id).map_err(|e| invalid(e.to_string()))?,
            line_number: LineNumber::new(self.line_number).map_err(|e| invalid(e.to_string()))?,
            operator_id: OperatorId::new(self.operator_id).map_err(|e| invalid(e.to_string()))?,
            date: NaiveDate::parse_from_str(&self.date, DATE_FORMAT)
                .map_err(|e| invalid(format!("date {:?}: {e}", self.date)))?,
            start_time: time(&self.start_time)?,
            end_time: time(&self.end_time)?,
            mode: Mode::try_from(self.mode).map_err(|e| invalid(e.to_string()))?,
            stitch_count: self.stitch_count,
            needle_runtime: self.needle_runtime,
            needle_stoptime: self.needle_stoptime,
            reserve: self.reserve,
            tx_log_id: self.tx_log_id,
            str_log_id: self.str_log_id,
        })
    }
}

/// Appends `WHERE` conditions for an entity and date range.
fn filter_clause(entity: &EntityFilter, range: &DateRange) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();
    match entity {
        EntityFilter::All => {}
        EntityFilter::Operator(id) => {
            conditions.push("operator_id = ?");
            values.push(id.to_string());
        }
        EntityFilter::Machine(id) => {
            conditions.push("machine_id = ?");
            values.push(id.to_string());
        }
        EntityFilter::Line(id) => {
            conditions.push("line_number = ?");
            values.push(id.to_string());
        }
    }
    if let Some(from) = range.from {
        conditions.push("date >= ?");
        values.push(from.format(DATE_FORMAT).to_string());
    }
    if let Some(to) = range.to {
        conditions.push("date <= ?");
        values.push(to.format(DATE_FORMAT).to_string());
    }
    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (clause, values)
}

const fn id_column(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Operator => "operator_id",
        EntityKind::Machine => "machine_id",
        EntityKind::Line => "line_number",
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- One row per machine event.
            -- date: 'YYYY-MM-DD'; start_time, end_time: 'HH:MM:SS'
            -- mode: device code 1..5
            -- tx_log_id, str_log_id: canonical device counters
            CREATE TABLE IF NOT EXISTS machine_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                machine_id TEXT NOT NULL,
                line_number TEXT NOT NULL,
                operator_id TEXT NOT NULL,
                date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                mode INTEGER NOT NULL,
                stitch_count INTEGER NOT NULL DEFAULT 0,
                needle_runtime REAL NOT NULL DEFAULT 0,
                needle_stoptime REAL NOT NULL DEFAULT 0,
                reserve TEXT NOT NULL DEFAULT '',
                tx_log_id INTEGER,
                str_log_id INTEGER,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_machine_logs_date ON machine_logs(date);
            CREATE INDEX IF NOT EXISTS idx_machine_logs_machine ON machine_logs(machine_id, date);
            CREATE INDEX IF NOT EXISTS idx_machine_logs_line ON machine_logs(line_number, date);
            CREATE INDEX IF NOT EXISTS idx_machine_logs_operator ON machine_logs(operator_id, date);
            CREATE INDEX IF NOT EXISTS idx_machine_logs_tx ON machine_logs(tx_log_id, machine_id, date);
            CREATE INDEX IF NOT EXISTS idx_machine_logs_str ON machine_logs(str_log_id, machine_id, date);

            -- Operator directory keyed by RFID card number.
            CREATE TABLE IF NOT EXISTS operators (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_operators_name ON operators(name);
            ",
        )?;
        Ok(())
    }

    /// Lists logs matching `filter`, ordered by date, start time and row id.
    pub fn list_logs(&self, filter: &LogFilter) -> Result<Vec<LogRecord>, DbError> {
        let (clause, values) = filter_clause(&filter.entity, &filter.range);
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT id, machine_id, line_number, operator_id, date, start_time, end_time,
                   mode, stitch_count, needle_runtime, needle_stoptime, reserve,
                   tx_log_id, str_log_id
            FROM machine_logs
            {clause}
            ORDER BY date ASC, start_time ASC, id ASC
            "
        ))?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            Ok(RawLog {
                row_id: row.get(0)?,
                machine_id: row.get(1)?,
                line_number: row.get(2)?,
                operator_id: row.get(3)?,
                date: row.get(4)?,
                start_time: row.get(5)?,
                end_time: row.get(6)?,
                mode: row.get(7)?,
                stitch_count: row.get(8)?,
                needle_runtime: row.get(9)?,
                needle_stoptime: row.get(10)?,
                reserve: row.get(11)?,
                tx_log_id: row.get(12)?,
                str_log_id: row.get(13)?,
            })
        })?;
        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?.into_record()?);
        }
        tracing::debug!(count = logs.len(), "loaded machine logs");
        Ok(logs)
    }

    /// Inserts a log and returns its row id.
    pub fn insert_log(&self, record: &LogRecord) -> Result<i64, DbError> {
        self.conn.execute(
            "
            INSERT INTO machine_logs
            (machine_id, line_number, operator_id, date, start_time, end_time, mode,
             stitch_count, needle_runtime, needle_stoptime, reserve, tx_log_id, str_log_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                record.machine_id.as_str(),
                record.line_number.as_str(),
                record.operator_id.as_str(),
                record.date.format(DATE_FORMAT).to_string(),
                record.start_time.format(TIME_FORMAT).to_string(),
                record.end_time.format(TIME_FORMAT).to_string(),
                record.mode.code(),
                record.stitch_count,
                record.needle_runtime,
                record.needle_stoptime,
                record.reserve,
                record.tx_log_id,
                record.str_log_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Whether a log with the given canonical counter and span exists.
    pub fn contains_log(&self, key: &DuplicateKey) -> Result<bool, DbError> {
        let column = match key.field {
            LogIdField::Tx => "tx_log_id",
            LogIdField::Str => "str_log_id",
        };
        let found: Option<i64> = self
            .conn
            .query_row(
                &format!(
                    "
                    SELECT 1 FROM machine_logs
                    WHERE {column} = ? AND machine_id = ? AND date = ?
                      AND start_time = ? AND end_time = ?
                    LIMIT 1
                    "
                ),
                params![
                    key.log_id,
                    key.machine_id.as_str(),
                    key.date.format(DATE_FORMAT).to_string(),
                    key.start_time.format(TIME_FORMAT).to_string(),
                    key.end_time.format(TIME_FORMAT).to_string(),
                ],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Distinct ids of `kind` with logs in `range`, sorted.
    pub fn distinct_ids(&self, kind: EntityKind, range: &DateRange) -> Result<Vec<String>, DbError> {
        let column = id_column(kind);
        let (clause, values) = filter_clause(&EntityFilter::All, range);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT DISTINCT {column} FROM machine_logs {clause} ORDER BY {column} ASC"
        ))?;
        let rows = stmt.query_map(params_from_iter(values), |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    /// Whether any log is attributed to `id`, without scanning every row.
    pub fn has_logs(&self, kind: EntityKind, id: &str) -> Result<bool, DbError> {
        let column = id_column(kind);
        let found: Option<i64> = self
            .conn
            .query_row(
                &format!("SELECT 1 FROM machine_logs WHERE {column} = ? LIMIT 1"),
                [id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Adds an operator, or renames an existing card.
    pub fn add_operator(&self, id: &OperatorId, name: &str) -> Result<(), DbError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DbError::InvalidOperator(sm_core::ValidationError::Empty {
                field: "operator name",
            }));
        }
        self.conn.execute(
            "
            INSERT INTO operators (id, name) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name
            ",
            params![id.as_str(), name],
        )?;
        Ok(())
    }

    /// Lists operators ordered by card number.
    pub fn list_operators(&self) -> Result<Vec<Operator>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM operators ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut operators = Vec::new();
        for row in rows {
            let (id, name) = row?;
            operators.push(Operator {
                id: OperatorId::new(id)?,
                name,
            });
        }
        Ok(operators)
    }

    fn operator_where(&self, column: &str, value: &str) -> Result<Option<Operator>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT id, name FROM operators WHERE {column} = ? ORDER BY id LIMIT 1"),
                [value],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        match row {
            Some((id, name)) => Ok(Some(Operator {
                id: OperatorId::new(id)?,
                name,
            })),
            None => Ok(None),
        }
    }
}

impl LogStore for Database {
    fn fetch(&self, filter: &LogFilter) -> Result<Vec<LogRecord>, StoreError> {
        Ok(self.list_logs(filter)?)
    }

    fn distinct_ids(&self, kind: EntityKind, range: &DateRange) -> Result<Vec<String>, StoreError> {
        Ok(Self::distinct_ids(self, kind, range)?)
    }

    fn has_logs(&self, kind: EntityKind, id: &str) -> Result<bool, StoreError> {
        Ok(Self::has_logs(self, kind, id)?)
    }
}

impl OperatorDirectory for Database {
    fn lookup(&self, id: &OperatorId) -> Result<Option<Operator>, StoreError> {
        Ok(self.operator_where("id", id.as_str())?)
    }

    fn find_by_name(&self, name: &str) -> Result<Option<Operator>, StoreError> {
        Ok(self.operator_where("name", name)?)
    }

    fn list(&self) -> Result<Vec<Operator>, StoreError> {
        Ok(self.list_operators()?)
    }
}

impl LogSink for Database {
    fn contains_log(&self, key: &DuplicateKey) -> Result<bool, StoreError> {
        Ok(Self::contains_log(self, key)?)
    }

    fn insert_log(&self, record: &LogRecord) -> Result<(), StoreError> {
        Self::insert_log(self, record)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use sm_core::ingest::{IngestOutcome, IngestPolicy, LogSubmission, ingest};
    use sm_core::{GroupingKey, OperatorScope, Report, ReportEngine, ReportRequest};
    use sm_core::WorkingHoursPolicy;

    fn log(machine: &str, line: &str, operator: &str, date: &str, span: (&str, &str), mode: Mode) -> LogRecord {
        LogRecord {
            machine_id: MachineId::new(machine).unwrap(),
            line_number: LineNumber::new(line).unwrap(),
            operator_id: OperatorId::new(operator).unwrap(),
            date: NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap(),
            start_time: NaiveTime::parse_from_str(span.0, "%H:%M").unwrap(),
            end_time: NaiveTime::parse_from_str(span.1, "%H:%M").unwrap(),
            mode,
            stitch_count: 250,
            needle_runtime: 900.0,
            needle_stoptime: 120.0,
            reserve: "1400".to_string(),
            tx_log_id: Some(7),
            str_log_id: None,
        }
    }

    fn seeded() -> Database {
        let db = Database::open_in_memory().expect("open in-memory db");
        for record in [
            log("M1", "1", "A17", "2025-01-06", ("09:00", "10:00"), Mode::Sewing),
            log("M1", "1", "A17", "2025-01-06", ("10:00", "10:20"), Mode::Meeting),
            log("M2", "1", "B2", "2025-01-07", ("09:00", "11:00"), Mode::Sewing),
            log("M3", "2", "0", "2025-01-08", ("09:00", "09:30"), Mode::Idle),
        ] {
            db.insert_log(&record).expect("insert log");
        }
        db.add_operator(&OperatorId::new("A17").unwrap(), "Asha").unwrap();
        db.add_operator(&OperatorId::new("B2").unwrap(), "Bilal").unwrap();
        db
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");
        assert_eq!(
            table_columns(&db.conn, "machine_logs"),
            vec![
                "id",
                "machine_id",
                "line_number",
                "operator_id",
                "date",
                "start_time",
                "end_time",
                "mode",
                "stitch_count",
                "needle_runtime",
                "needle_stoptime",
                "reserve",
                "tx_log_id",
                "str_log_id",
                "created_at",
            ]
        );
        assert_eq!(table_columns(&db.conn, "operators"), vec!["id", "name"]);
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    #[test]
    fn stored_logs_read_back_unchanged() {
        let db = Database::open_in_memory().unwrap();
        let original = log("M1", "1", "A17", "2025-01-06", ("09:00", "10:00"), Mode::Sewing);
        db.insert_log(&original).unwrap();
        let logs = db
            .list_logs(&LogFilter::new(EntityFilter::All, DateRange::unbounded()))
            .unwrap();
        assert_eq!(logs, vec![original]);
    }

    #[test]
    fn fetch_filters_by_entity_and_range() {
        let db = seeded();
        let by_line = db
            .list_logs(&LogFilter::new(
                EntityFilter::Line(LineNumber::new("1").unwrap()),
                DateRange::unbounded(),
            ))
            .unwrap();
        assert_eq!(by_line.len(), 3);

        let range = DateRange::parse(Some("2025-01-07"), Some("2025-01-07")).unwrap();
        let in_range = db.list_logs(&LogFilter::new(EntityFilter::All, range)).unwrap();
        assert_eq!(in_range.len(), 1);
        assert_eq!(in_range[0].machine_id.as_str(), "M2");

        let by_operator = db
            .list_logs(&LogFilter::new(
                EntityFilter::Operator(OperatorId::new("A17").unwrap()),
                DateRange::unbounded(),
            ))
            .unwrap();
        assert_eq!(by_operator.len(), 2);
        assert!(by_operator[0].start_time < by_operator[1].start_time);
    }

    #[test]
    fn distinct_ids_are_sorted_per_kind() {
        let db = seeded();
        let range = DateRange::parse(Some("2025-01-06"), Some("2025-01-07")).unwrap();
        assert_eq!(db.distinct_ids(EntityKind::Machine, &range).unwrap(), vec!["M1", "M2"]);
        assert_eq!(db.distinct_ids(EntityKind::Line, &DateRange::unbounded()).unwrap(), vec!["1", "2"]);
        assert_eq!(
            db.distinct_ids(EntityKind::Operator, &DateRange::unbounded()).unwrap(),
            vec!["0", "A17", "B2"]
        );
    }

    #[test]
    fn has_logs_checks_one_entity() {
        let db = seeded();
        assert!(db.has_logs(EntityKind::Machine, "M3").unwrap());
        assert!(db.has_logs(EntityKind::Line, "2").unwrap());
        assert!(db.has_logs(EntityKind::Operator, "B2").unwrap());
        assert!(!db.has_logs(EntityKind::Machine, "M9").unwrap());
        assert!(!db.has_logs(EntityKind::Line, "M1").unwrap());
        assert!(LogStore::has_logs(&db, EntityKind::Machine, "M1").unwrap());
    }

    #[test]
    fn operators_can_be_renamed_and_found_by_name() {
        let db = seeded();
        let id = OperatorId::new("A17").unwrap();
        db.add_operator(&id, "Asha K").unwrap();

        let found = OperatorDirectory::find_by_name(&db, "Asha K").unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(OperatorDirectory::find_by_name(&db, "Asha").unwrap().is_none());
        assert_eq!(db.resolve_name(&OperatorId::new("Z").unwrap()).unwrap(), "Unknown");

        let names: Vec<_> = db.list_operators().unwrap().into_iter().map(|o| o.name).collect();
        assert_eq!(names, vec!["Asha K", "Bilal"]);

        assert!(matches!(db.add_operator(&id, "  "), Err(DbError::InvalidOperator(_))));
    }

    #[test]
    fn ingestion_suppresses_retransmissions() {
        let db = Database::open_in_memory().unwrap();
        let payload = r#"{
            "MACHINE_ID": "M1", "LINE_NUMB": "1", "OPERATOR_ID": "A17",
            "DATE": "2025-01-06", "START_TIME": "09:00:00", "END_TIME": "09:10:00",
            "MODE": "1", "Tx_LOGID": 41
        }"#;
        let first: LogSubmission = serde_json_payload(payload);
        let policy = IngestPolicy::default();
        assert_eq!(ingest(&db, &first, &policy).unwrap(), IngestOutcome::Inserted);

        let mut resent = first.clone();
        resent.tx_log_id = Some(sm_core::ingest::LooseValue::Integer(1041));
        assert_eq!(ingest(&db, &resent, &policy).unwrap(), IngestOutcome::Duplicate);

        let logs = db
            .list_logs(&LogFilter::new(EntityFilter::All, DateRange::unbounded()))
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].tx_log_id, Some(41));
    }

    fn serde_json_payload(json: &str) -> LogSubmission {
        serde_json::from_str(json).expect("valid payload")
    }

    #[test]
    fn file_database_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sm.db");
        {
            let db = Database::open(&path).unwrap();
            db.insert_log(&log("M1", "1", "A17", "2025-01-06", ("09:00", "10:00"), Mode::Sewing))
                .unwrap();
            db.add_operator(&OperatorId::new("A17").unwrap(), "Asha").unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_operators().unwrap().len(), 1);
        assert_eq!(
            db.list_logs(&LogFilter::new(EntityFilter::All, DateRange::unbounded()))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn engine_reads_through_database() {
        let db = seeded();
        let policy = WorkingHoursPolicy::default();
        let now = NaiveDateTime::parse_from_str("2025-02-01 12:00", "%Y-%m-%d %H:%M").unwrap();
        let report = ReportEngine::new(&db, &db, &policy)
            .build(&ReportRequest {
                grouping: GroupingKey::ByOperator(OperatorScope::Named("Asha".to_string())),
                range: DateRange::unbounded(),
                now,
            })
            .unwrap();
        let Report::Operator(report) = report else {
            panic!("expected operator report");
        };
        assert!((report.total_production_hours - 1.0).abs() < 1e-9);
        assert_eq!(report.total_stitch_count, 500);
        assert_eq!(report.table_data[0].operator_name, "Asha");
    }

    #[test]
    fn corrupt_rows_surface_as_errors() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO machine_logs
                 (machine_id, line_number, operator_id, date, start_time, end_time, mode)
                 VALUES ('M1', '1', 'A17', '2025-01-06', '09:00:00', '10:00:00', 9)",
                [],
            )
            .unwrap();
        let err = db
            .list_logs(&LogFilter::new(EntityFilter::All, DateRange::unbounded()))
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidRow { .. }));
    }
}
