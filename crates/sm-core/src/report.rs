//! Report assembly for operators, machines and lines.
//!
//! Every report runs the same pipeline: fetch, classify, aggregate, then
//! divide by an availability envelope. What differs between report kinds is
//! captured by a [`ReportProfile`]:
//!
//! | Grouping          | Availability                   | Idle     |
//! |-------------------|--------------------------------|----------|
//! | operator          | dynamic workday with breaks    | residual |
//! | line, all lines   | dynamic workday with breaks    | residual |
//! | machine, all      | flat `machine_daily_hours`/day | logged   |
//!
//! Residual idle is whatever the availability envelope leaves unaccounted.
//! Logged idle trusts the mode-2 records, and percentages are then taken over
//! the logged total instead of the envelope.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use serde::Serialize;

use crate::aggregate::{ModeTotals, group_by};
use crate::availability::AvailabilityStrategy;
use crate::classify::{ClassifiedRecord, classify};
use crate::error::EngineError;
use crate::policy::WorkingHoursPolicy;
use crate::record::LogRecord;
use crate::store::{
    DateRange, EntityFilter, EntityKind, LogFilter, LogStore, OperatorDirectory,
};
use crate::types::{LineNumber, MachineId, Mode, OperatorId};

/// Rounds to two decimals for presentation.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / whole * 100`, or zero when `whole` is not positive.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

/// Which operators an operator report covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorScope {
    All,
    /// An operator looked up by display name.
    Named(String),
}

/// What a report is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupingKey {
    ByOperator(OperatorScope),
    ByMachine(MachineId),
    ByLine(LineNumber),
    ByMachineAll,
    ByLineAll,
}

/// Where idle hours come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleSource {
    /// Availability minus every other mode, floored at zero.
    Residual,
    /// Hours actually logged in mode 2.
    Logged,
}

/// Availability and idle rules for one kind of report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportProfile {
    pub availability: AvailabilityStrategy,
    pub idle: IdleSource,
}

impl ReportProfile {
    pub fn for_grouping(grouping: &GroupingKey, policy: &WorkingHoursPolicy) -> Self {
        match grouping {
            GroupingKey::ByOperator(_) | GroupingKey::ByLine(_) | GroupingKey::ByLineAll => Self {
                availability: AvailabilityStrategy::DynamicWorkdayWithBreaks,
                idle: IdleSource::Residual,
            },
            GroupingKey::ByMachine(_) | GroupingKey::ByMachineAll => Self {
                availability: AvailabilityStrategy::FlatDailyConstant(policy.machine_daily_hours),
                idle: IdleSource::Logged,
            },
        }
    }
}

/// A report request. `now` decides which date counts as today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub grouping: GroupingKey,
    pub range: DateRange,
    pub now: NaiveDateTime,
}

/// Hours and percentages for one group, at full precision.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Figures {
    /// Hours the availability strategy grants.
    pub available_hours: f64,
    /// Denominator for the percentages.
    pub total_hours: f64,
    pub production_hours: f64,
    pub no_feeding_hours: f64,
    pub meeting_hours: f64,
    pub maintenance_hours: f64,
    pub idle_hours: f64,
    pub non_production_hours: f64,
    pub production_percentage: f64,
    pub npt_percentage: f64,
}

impl Figures {
    pub fn compute(totals: &ModeTotals, available_hours: f64, idle: IdleSource) -> Self {
        let accounted = totals.accounted_hours();
        let (idle_hours, total_hours) = match idle {
            IdleSource::Residual => ((available_hours - accounted).max(0.0), available_hours),
            IdleSource::Logged => (totals.logged_idle_hours, accounted + totals.logged_idle_hours),
        };
        let production_hours = totals.sewing_hours;
        let non_production_hours = totals.stoppage_hours() + idle_hours;
        Self {
            available_hours,
            total_hours,
            production_hours,
            no_feeding_hours: totals.no_feeding_hours,
            meeting_hours: totals.meeting_hours,
            maintenance_hours: totals.maintenance_hours,
            idle_hours,
            non_production_hours,
            production_percentage: percentage(production_hours, total_hours),
            npt_percentage: percentage(non_production_hours, total_hours),
        }
    }
}

/// Sewing needle runtime as a share of production hours.
fn needle_runtime_percentage(totals: &ModeTotals, production_hours: f64) -> f64 {
    percentage(totals.sewing_needle_runtime / 3600.0, production_hours)
}

/// Hours with their share of the total.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeShare {
    pub hours: f64,
    pub percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<NonProductiveBreakdown>,
}

/// Non-productive hours per cause.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonProductiveBreakdown {
    pub no_feeding_hours: f64,
    pub meeting_hours: f64,
    pub maintenance_hours: f64,
    pub idle_hours: f64,
}

/// One day of a machine or line report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Sewing Hours (PT)")]
    pub sewing_hours: f64,
    #[serde(rename = "No Feeding Hours")]
    pub no_feeding_hours: f64,
    #[serde(rename = "Meeting Hours")]
    pub meeting_hours: f64,
    #[serde(rename = "Maintenance Hours")]
    pub maintenance_hours: f64,
    #[serde(rename = "Idle Hours")]
    pub idle_hours: f64,
    #[serde(rename = "Total Hours")]
    pub total_hours: f64,
    #[serde(rename = "Productive Time (PT) %")]
    pub production_percentage: f64,
    #[serde(rename = "Non-Productive Time (NPT) %")]
    pub npt_percentage: f64,
    #[serde(rename = "Sewing Speed")]
    pub sewing_speed: f64,
    #[serde(rename = "Stitch Count")]
    pub stitch_count: u64,
    #[serde(rename = "Needle Runtime")]
    pub needle_runtime: f64,
    #[serde(rename = "Machine ID", skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<MachineId>,
    #[serde(rename = "Machine Count", skip_serializing_if = "Option::is_none")]
    pub machine_count: Option<usize>,
}

/// Line-only figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineUtilization {
    /// Hours logged in mode 2.
    pub total_ideal_hours: f64,
    pub utilization_percentage: f64,
    /// Mean distinct machines per working day.
    pub average_machines: f64,
}

/// Report for a single machine or line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<MachineId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<LineNumber>,
    #[serde(flatten)]
    pub line: Option<LineUtilization>,
    pub total_available_hours: f64,
    pub total_working_days: usize,
    pub total_hours: f64,
    pub total_productive_time: TimeShare,
    pub total_non_productive_time: TimeShare,
    pub total_stitch_count: u64,
    pub average_sewing_speed: f64,
    /// Needle runtime of every counted record, in seconds.
    pub total_needle_runtime: f64,
    /// Mean needle runtime per sewing record, in seconds.
    pub average_needle_runtime: f64,
    pub needle_runtime_percentage: f64,
    pub table_data: Vec<DailyRow>,
}

/// One operator-day of an operator report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Operator ID")]
    pub operator_id: OperatorId,
    #[serde(rename = "Operator Name")]
    pub operator_name: String,
    #[serde(rename = "Total Hours")]
    pub total_hours: f64,
    #[serde(rename = "Sewing Hours")]
    pub sewing_hours: f64,
    #[serde(rename = "Idle Hours")]
    pub idle_hours: f64,
    #[serde(rename = "Meeting Hours")]
    pub meeting_hours: f64,
    #[serde(rename = "No Feeding Hours")]
    pub no_feeding_hours: f64,
    #[serde(rename = "Maintenance Hours")]
    pub maintenance_hours: f64,
    #[serde(rename = "Productive Time in %")]
    pub production_percentage: f64,
    #[serde(rename = "NPT in %")]
    pub npt_percentage: f64,
    #[serde(rename = "Sewing Speed")]
    pub sewing_speed: f64,
    #[serde(rename = "Stitch Count")]
    pub stitch_count: u64,
    #[serde(rename = "Needle Runtime")]
    pub needle_runtime: f64,
}

/// Report for one operator or for all of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorReport {
    pub total_hours: f64,
    pub total_production_hours: f64,
    pub total_non_production_hours: f64,
    pub total_idle_hours: f64,
    pub production_percentage: f64,
    pub npt_percentage: f64,
    pub average_sewing_speed: f64,
    pub total_stitch_count: u64,
    /// Needle runtime of sewing records, in seconds.
    pub total_needle_runtime: f64,
    pub average_needle_runtime: f64,
    pub needle_runtime_percentage: f64,
    #[serde(rename = "totalPT")]
    pub total_pt: f64,
    #[serde(rename = "totalNPT")]
    pub total_npt: f64,
    /// One row per operator per day, each with its own daily envelope.
    ///
    /// `totalHours` counts every date once, so when several operators share a
    /// date in an all-operator report the rows add up to more than it.
    pub table_data: Vec<OperatorRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllMachinesReport {
    pub all_machines_report: Vec<EntityReport>,
    pub total_machines: usize,
    #[serde(rename = "from_date")]
    pub from_date: Option<NaiveDate>,
    #[serde(rename = "to_date")]
    pub to_date: Option<NaiveDate>,
}

/// Fleet-wide roll-up of the per-line reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSummary {
    pub total_lines: usize,
    pub total_ideal_hours: f64,
    pub utilization_percentage: f64,
    /// Longest run of working days on any single line.
    pub total_working_days: usize,
    pub average_machines: f64,
    pub total_hours: f64,
    pub total_productive_time: TimeShare,
    pub total_non_productive_time: TimeShare,
    pub total_stitch_count: u64,
    /// Sewing speed weighted by each line's total hours.
    pub average_sewing_speed: f64,
    pub total_needle_runtime: f64,
    pub needle_runtime_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllLinesReport {
    pub all_lines_report: Vec<EntityReport>,
    pub summary: LineSummary,
}

/// Any report the engine can build.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Operator(OperatorReport),
    Machine(EntityReport),
    Line(EntityReport),
    AllMachines(AllMachinesReport),
    AllLines(AllLinesReport),
}

/// Subject of an [`EntityReport`].
#[derive(Debug, Clone)]
enum Subject {
    Machine(MachineId),
    Line(LineNumber),
}

/// An entity report with the unrounded numbers behind it.
struct EntityComputation {
    report: EntityReport,
    figures: Figures,
    totals: ModeTotals,
    average_machines: f64,
}

fn time_shares(figures: &Figures) -> (TimeShare, TimeShare) {
    (
        TimeShare {
            hours: round2(figures.production_hours),
            percentage: round2(figures.production_percentage),
            breakdown: None,
        },
        TimeShare {
            hours: round2(figures.non_production_hours),
            percentage: round2(figures.npt_percentage),
            breakdown: Some(NonProductiveBreakdown {
                no_feeding_hours: round2(figures.no_feeding_hours),
                meeting_hours: round2(figures.meeting_hours),
                maintenance_hours: round2(figures.maintenance_hours),
                idle_hours: round2(figures.idle_hours),
            }),
        },
    )
}

#[allow(clippy::cast_precision_loss)]
fn compute_entity(
    policy: &WorkingHoursPolicy,
    profile: ReportProfile,
    now: NaiveDateTime,
    subject: Subject,
    records: &[LogRecord],
) -> EntityComputation {
    let classified = classify(policy, records);
    let totals = ModeTotals::from_records(&classified);
    let available = profile
        .availability
        .total_hours(policy, &totals.dates, now);
    let figures = Figures::compute(&totals, available, profile.idle);

    let daily = group_by(&classified, |c| c.record.date);
    let table_data: Vec<DailyRow> = daily
        .iter()
        .map(|(date, day)| {
            let day_available = profile.availability.day_hours(policy, *date, now);
            let f = Figures::compute(day, day_available, profile.idle);
            DailyRow {
                date: *date,
                sewing_hours: round2(f.production_hours),
                no_feeding_hours: round2(f.no_feeding_hours),
                meeting_hours: round2(f.meeting_hours),
                maintenance_hours: round2(f.maintenance_hours),
                idle_hours: round2(f.idle_hours),
                total_hours: round2(f.total_hours),
                production_percentage: round2(f.production_percentage),
                npt_percentage: round2(f.npt_percentage),
                sewing_speed: round2(day.average_speed()),
                stitch_count: day.stitch_count,
                needle_runtime: round2(day.needle_runtime),
                machine_id: match &subject {
                    Subject::Machine(id) => Some(id.clone()),
                    Subject::Line(_) => None,
                },
                machine_count: match &subject {
                    Subject::Machine(_) => None,
                    Subject::Line(_) => Some(day.machines.len()),
                },
            }
        })
        .collect();

    let average_machines = if daily.is_empty() {
        0.0
    } else {
        daily.values().map(|day| day.machines.len()).sum::<usize>() as f64 / daily.len() as f64
    };

    let (machine_id, line_number, line) = match subject {
        Subject::Machine(id) => (Some(id), None, None),
        Subject::Line(number) => (
            None,
            Some(number),
            Some(LineUtilization {
                total_ideal_hours: round2(totals.logged_idle_hours),
                utilization_percentage: round2(percentage(
                    figures.total_hours,
                    totals.logged_idle_hours,
                )),
                average_machines: round2(average_machines),
            }),
        ),
    };

    let (productive, non_productive) = time_shares(&figures);
    let report = EntityReport {
        machine_id,
        line_number,
        line,
        total_available_hours: round2(figures.available_hours),
        total_working_days: totals.working_days(),
        total_hours: round2(figures.total_hours),
        total_productive_time: productive,
        total_non_productive_time: non_productive,
        total_stitch_count: totals.stitch_count,
        average_sewing_speed: round2(totals.average_speed()),
        total_needle_runtime: round2(totals.needle_runtime),
        average_needle_runtime: round2(totals.average_sewing_needle_runtime()),
        needle_runtime_percentage: round2(needle_runtime_percentage(
            &totals,
            figures.production_hours,
        )),
        table_data,
    };

    EntityComputation {
        report,
        figures,
        totals,
        average_machines,
    }
}

#[allow(clippy::cast_precision_loss)]
fn summarize_lines(lines: &[EntityComputation]) -> LineSummary {
    let total_hours: f64 = lines.iter().map(|l| l.figures.total_hours).sum();
    let production: f64 = lines.iter().map(|l| l.figures.production_hours).sum();
    let non_production: f64 = lines.iter().map(|l| l.figures.non_production_hours).sum();
    let ideal: f64 = lines.iter().map(|l| l.totals.logged_idle_hours).sum();
    let weighted_speed: f64 = lines
        .iter()
        .map(|l| l.totals.average_speed() * l.figures.total_hours)
        .sum();
    let sewing_needle_runtime: f64 = lines.iter().map(|l| l.totals.sewing_needle_runtime).sum();
    let average_machines = if lines.is_empty() {
        0.0
    } else {
        lines.iter().map(|l| l.average_machines).sum::<f64>() / lines.len() as f64
    };

    LineSummary {
        total_lines: lines.len(),
        total_ideal_hours: round2(ideal),
        utilization_percentage: round2(percentage(total_hours, ideal)),
        total_working_days: lines
            .iter()
            .map(|l| l.totals.working_days())
            .max()
            .unwrap_or(0),
        average_machines: round2(average_machines),
        total_hours: round2(total_hours),
        total_productive_time: TimeShare {
            hours: round2(production),
            percentage: round2(percentage(production, total_hours)),
            breakdown: None,
        },
        total_non_productive_time: TimeShare {
            hours: round2(non_production),
            percentage: round2(percentage(non_production, total_hours)),
            breakdown: None,
        },
        total_stitch_count: lines.iter().map(|l| l.totals.stitch_count).sum(),
        average_sewing_speed: round2(if total_hours > 0.0 {
            weighted_speed / total_hours
        } else {
            0.0
        }),
        total_needle_runtime: round2(lines.iter().map(|l| l.totals.needle_runtime).sum()),
        needle_runtime_percentage: round2(percentage(sewing_needle_runtime / 3600.0, production)),
    }
}

/// Splits records into per-entity buckets, ordered by key.
fn partition<K, F>(records: Vec<LogRecord>, key: F) -> Vec<(K, Vec<LogRecord>)>
where
    K: Ord,
    F: Fn(&LogRecord) -> K,
{
    let mut buckets: BTreeMap<K, Vec<LogRecord>> = BTreeMap::new();
    for record in records {
        buckets.entry(key(&record)).or_default().push(record);
    }
    buckets.into_iter().collect()
}

/// Builds reports from a log store and an operator directory.
pub struct ReportEngine<'a, S: ?Sized, D: ?Sized> {
    store: &'a S,
    directory: &'a D,
    policy: &'a WorkingHoursPolicy,
}

impl<'a, S, D> ReportEngine<'a, S, D>
where
    S: LogStore + ?Sized,
    D: OperatorDirectory + ?Sized,
{
    pub const fn new(store: &'a S, directory: &'a D, policy: &'a WorkingHoursPolicy) -> Self {
        Self {
            store,
            directory,
            policy,
        }
    }

    pub const fn policy(&self) -> &WorkingHoursPolicy {
        self.policy
    }

    pub(crate) const fn directory(&self) -> &D {
        self.directory
    }

    pub(crate) fn fetch(&self, entity: EntityFilter, range: &DateRange) -> Result<Vec<LogRecord>, EngineError> {
        self.store
            .fetch(&LogFilter::new(entity, *range))
            .map_err(EngineError::store)
    }

    /// Fetches logs whose operator is in the directory.
    fn fetch_known(&self, entity: EntityFilter, range: &DateRange) -> Result<Vec<LogRecord>, EngineError> {
        let known: BTreeSet<OperatorId> = self
            .directory
            .list()
            .map_err(EngineError::store)?
            .into_iter()
            .map(|operator| operator.id)
            .collect();
        let mut records = self.fetch(entity, range)?;
        let before = records.len();
        records.retain(|record| known.contains(&record.operator_id));
        tracing::debug!(
            kept = records.len(),
            dropped = before - records.len(),
            "filtered logs to known operators"
        );
        Ok(records)
    }

    fn ensure_exists(&self, kind: EntityKind, id: &str) -> Result<(), EngineError> {
        if self.store.has_logs(kind, id).map_err(EngineError::store)? {
            Ok(())
        } else {
            Err(EngineError::UnknownEntity {
                kind: kind.as_str(),
                id: id.to_string(),
            })
        }
    }

    /// Builds the report described by `request`.
    pub fn build(&self, request: &ReportRequest) -> Result<Report, EngineError> {
        let profile = ReportProfile::for_grouping(&request.grouping, self.policy);
        tracing::debug!(grouping = ?request.grouping, range = ?request.range, "building report");

        match &request.grouping {
            GroupingKey::ByOperator(scope) => self
                .operator_report(scope, &request.range, request.now, profile)
                .map(Report::Operator),
            GroupingKey::ByMachine(id) => {
                self.ensure_exists(EntityKind::Machine, id.as_str())?;
                let records = self.fetch_known(EntityFilter::Machine(id.clone()), &request.range)?;
                let computed = compute_entity(
                    self.policy,
                    profile,
                    request.now,
                    Subject::Machine(id.clone()),
                    &records,
                );
                Ok(Report::Machine(computed.report))
            }
            GroupingKey::ByLine(number) => {
                self.ensure_exists(EntityKind::Line, number.as_str())?;
                let records = self.fetch_known(EntityFilter::Line(number.clone()), &request.range)?;
                let computed = compute_entity(
                    self.policy,
                    profile,
                    request.now,
                    Subject::Line(number.clone()),
                    &records,
                );
                Ok(Report::Line(computed.report))
            }
            GroupingKey::ByMachineAll => {
                let records = self.fetch_known(EntityFilter::All, &request.range)?;
                let machines = partition(records, |r| r.machine_id.clone());
                let policy = self.policy;
                let now = request.now;
                let reports: Vec<EntityReport> = machines
                    .par_iter()
                    .map(|(id, logs)| {
                        compute_entity(policy, profile, now, Subject::Machine(id.clone()), logs)
                            .report
                    })
                    .collect();
                Ok(Report::AllMachines(AllMachinesReport {
                    total_machines: reports.len(),
                    all_machines_report: reports,
                    from_date: request.range.from,
                    to_date: request.range.to,
                }))
            }
            GroupingKey::ByLineAll => {
                let records = self.fetch_known(EntityFilter::All, &request.range)?;
                let lines = partition(records, |r| r.line_number.clone());
                let policy = self.policy;
                let now = request.now;
                let computed: Vec<EntityComputation> = lines
                    .par_iter()
                    .map(|(number, logs)| {
                        compute_entity(policy, profile, now, Subject::Line(number.clone()), logs)
                    })
                    .collect();
                let summary = summarize_lines(&computed);
                Ok(Report::AllLines(AllLinesReport {
                    all_lines_report: computed.into_iter().map(|c| c.report).collect(),
                    summary,
                }))
            }
        }
    }

    fn operator_report(
        &self,
        scope: &OperatorScope,
        range: &DateRange,
        now: NaiveDateTime,
        profile: ReportProfile,
    ) -> Result<OperatorReport, EngineError> {
        let entity = match scope {
            OperatorScope::All => EntityFilter::All,
            OperatorScope::Named(name) => {
                let operator = self
                    .directory
                    .find_by_name(name)
                    .map_err(EngineError::store)?
                    .ok_or_else(|| EngineError::UnknownEntity {
                        kind: EntityKind::Operator.as_str(),
                        id: name.clone(),
                    })?;
                EntityFilter::Operator(operator.id)
            }
        };

        let mut records = self.fetch(entity, range)?;
        records.retain(|r| !(r.operator_id.is_unassigned() && r.mode == Mode::Idle));

        let classified = classify(self.policy, &records);
        let totals = ModeTotals::from_records(&classified);
        let available = profile
            .availability
            .total_hours(self.policy, &totals.dates, now);
        let figures = Figures::compute(&totals, available, profile.idle);

        let table_data = self.operator_rows(&classified, now, profile)?;

        Ok(OperatorReport {
            total_hours: round2(figures.total_hours),
            total_production_hours: round2(figures.production_hours),
            total_non_production_hours: round2(figures.non_production_hours),
            total_idle_hours: round2(figures.idle_hours),
            production_percentage: round2(figures.production_percentage),
            npt_percentage: round2(figures.npt_percentage),
            average_sewing_speed: round2(totals.average_speed()),
            total_stitch_count: totals.stitch_count,
            total_needle_runtime: round2(totals.sewing_needle_runtime),
            average_needle_runtime: round2(totals.average_sewing_needle_runtime()),
            needle_runtime_percentage: round2(needle_runtime_percentage(
                &totals,
                figures.production_hours,
            )),
            total_pt: round2(figures.production_hours),
            total_npt: round2(figures.non_production_hours),
            table_data,
        })
    }

    fn operator_rows(
        &self,
        classified: &[ClassifiedRecord<'_>],
        now: NaiveDateTime,
        profile: ReportProfile,
    ) -> Result<Vec<OperatorRow>, EngineError> {
        let groups = group_by(classified, |c| (c.record.date, c.record.operator_id.clone()));

        let mut names: BTreeMap<&OperatorId, String> = BTreeMap::new();
        for (_, operator_id) in groups.keys() {
            if !names.contains_key(operator_id) {
                let name = self
                    .directory
                    .resolve_name(operator_id)
                    .map_err(EngineError::store)?;
                names.insert(operator_id, name);
            }
        }

        Ok(groups
            .iter()
            .map(|((date, operator_id), day)| {
                let day_available = profile.availability.day_hours(self.policy, *date, now);
                let f = Figures::compute(day, day_available, profile.idle);
                OperatorRow {
                    date: *date,
                    operator_id: operator_id.clone(),
                    operator_name: names.get(operator_id).cloned().unwrap_or_default(),
                    total_hours: round2(f.total_hours),
                    sewing_hours: round2(f.production_hours),
                    idle_hours: round2(f.idle_hours),
                    meeting_hours: round2(f.meeting_hours),
                    no_feeding_hours: round2(f.no_feeding_hours),
                    maintenance_hours: round2(f.maintenance_hours),
                    production_percentage: round2(f.production_percentage),
                    npt_percentage: round2(f.npt_percentage),
                    sewing_speed: round2(day.average_speed()),
                    stitch_count: day.stitch_count,
                    needle_runtime: round2(day.needle_runtime),
                }
            })
            .collect())
    }
}
