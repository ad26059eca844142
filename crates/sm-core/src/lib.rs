//! Time accounting for sewing-line machine logs.
//!
//! This crate contains the reporting engine and its collaborator seams:
//! - Classification: clipping logs to the working window and dropping breaks
//! - Aggregation: mode totals per operator, machine, line or day
//! - Reports: availability envelopes, percentages and daily tables
//! - Listings: filtered logs with hours per mode
//! - Ingestion: validating device payloads and suppressing retransmissions
//!
//! Storage lives behind [`LogStore`], [`LogSink`] and [`OperatorDirectory`].

mod aggregate;
mod availability;
mod breaks;
mod classify;
mod consolidated;
pub mod efficiency;
mod error;
pub mod ingest;
mod policy;
mod record;
pub mod report;
mod store;
mod summary;
pub mod types;
mod window;

pub use aggregate::{ModeTotals, group_by};
pub use availability::{AvailabilityStrategy, DailyAvailability};
pub use breaks::{BreakInterval, BreakStrategy};
pub use classify::{ClassifiedRecord, classify, duration_hours};
pub use consolidated::{ConsolidatedLogs, LogSelection, LogSummary};
pub use efficiency::{FleetCounts, LineEfficiency, OperatorEfficiency};
pub use error::{EngineError, StoreError};
pub use ingest::{DuplicateKey, IngestOutcome, IngestPolicy, LogIdField, LogSubmission, ingest};
pub use policy::WorkingHoursPolicy;
pub use record::{LogRecord, seconds_of_day};
pub use report::{
    GroupingKey, IdleSource, OperatorScope, Report, ReportEngine, ReportProfile, ReportRequest,
    round2,
};
pub use store::{
    DateRange, EntityFilter, EntityKind, LogFilter, LogSink, LogStore, Operator,
    OperatorDirectory, UNKNOWN_OPERATOR, active_ids,
};
pub use summary::OperatorSummary;
pub use types::{LineNumber, MachineId, Mode, OperatorId, ValidationError, parse_date};
pub use window::ClippedSpan;
