//! Logs command for listing stored machine logs with a per-mode summary.

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use sm_core::{
    DateRange, EngineError, LineNumber, LogRecord, LogSelection, LogStore, LogSummary, MachineId,
    OperatorDirectory, OperatorId, ReportEngine, WorkingHoursPolicy,
};

use super::util::parse_range;
use crate::RangeArgs;

/// A log as listed, with the mode label and operator name resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    #[serde(rename = "MACHINE_ID")]
    pub machine_id: MachineId,
    #[serde(rename = "LINE_NUMB")]
    pub line_number: LineNumber,
    #[serde(rename = "OPERATOR_ID")]
    pub operator_id: OperatorId,
    /// Empty when nobody was logged in or the card is not registered.
    #[serde(rename = "OPERATOR_NAME")]
    pub operator_name: String,
    #[serde(rename = "DATE")]
    pub date: NaiveDate,
    #[serde(rename = "START_TIME")]
    pub start_time: NaiveTime,
    #[serde(rename = "END_TIME")]
    pub end_time: NaiveTime,
    #[serde(rename = "MODE")]
    pub mode: &'static str,
    #[serde(rename = "STITCH_COUNT")]
    pub stitch_count: u64,
    #[serde(rename = "NEEDLE_RUNTIME")]
    pub needle_runtime: f64,
    #[serde(rename = "RESERVE")]
    pub reserve: String,
}

/// Raw `--machine`, `--line` and `--operator` values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub machines: Vec<String>,
    pub lines: Vec<String>,
    pub operators: Vec<String>,
}

/// Filters echoed back in JSON output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedFilters {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub machine_ids: Vec<String>,
    pub line_numbers: Vec<String>,
    pub operator_names: Vec<String>,
}

/// Everything `sm logs` shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogListing {
    pub summary: LogSummary,
    pub logs: Vec<LogEntry>,
    pub filters: AppliedFilters,
}

/// Validates the filters into a selection.
pub fn selection(filters: &Filters, range: DateRange) -> Result<LogSelection> {
    let machines = filters
        .machines
        .iter()
        .map(|id| MachineId::new(id.trim()))
        .collect::<Result<_, _>>()?;
    let lines = filters
        .lines
        .iter()
        .map(|number| LineNumber::new(number.trim()))
        .collect::<Result<_, _>>()?;
    Ok(LogSelection {
        machines,
        lines,
        operators: filters.operators.clone(),
        range,
    })
}

/// Loads the selected logs, resolves operator names and summarizes.
pub fn list<S, D>(
    store: &S,
    directory: &D,
    policy: &WorkingHoursPolicy,
    filters: &Filters,
    range: DateRange,
) -> Result<LogListing>
where
    S: LogStore + ?Sized,
    D: OperatorDirectory + ?Sized,
{
    let wanted = selection(filters, range)?;
    let consolidated = ReportEngine::new(store, directory, policy).consolidated_logs(&wanted)?;

    let names: BTreeMap<OperatorId, String> = directory
        .list()
        .map_err(EngineError::store)?
        .into_iter()
        .map(|operator| (operator.id, operator.name))
        .collect();

    Ok(LogListing {
        summary: consolidated.summary,
        logs: consolidated
            .logs
            .into_iter()
            .map(|record| entry(record, &names))
            .collect(),
        filters: AppliedFilters {
            from_date: range.from,
            to_date: range.to,
            machine_ids: filters.machines.clone(),
            line_numbers: filters.lines.clone(),
            operator_names: filters.operators.clone(),
        },
    })
}

fn entry(record: LogRecord, names: &BTreeMap<OperatorId, String>) -> LogEntry {
    let operator_name = if record.operator_id.is_unassigned() {
        String::new()
    } else {
        names.get(&record.operator_id).cloned().unwrap_or_default()
    };
    LogEntry {
        operator_name,
        mode: record.mode.label(),
        machine_id: record.machine_id,
        line_number: record.line_number,
        operator_id: record.operator_id,
        date: record.date,
        start_time: record.start_time,
        end_time: record.end_time,
        stitch_count: record.stitch_count,
        needle_runtime: record.needle_runtime,
        reserve: record.reserve,
    }
}

/// Formats log entries as a table.
pub fn format_entries(entries: &[LogEntry]) -> Result<String, fmt::Error> {
    let mut output = String::new();
    if entries.is_empty() {
        writeln!(output, "No logs recorded in this range.")?;
        return Ok(output);
    }

    writeln!(
        output,
        "{:<12}{:<10}{:<10}  {:<10}{:<16}{:<10}{:<10}{:<14}{:>9}{:>9}",
        "DATE", "START", "END", "MACHINE", "OPERATOR", "NAME", "LINE", "MODE", "STITCHES", "RUNTIME"
    )?;
    for entry in entries {
        writeln!(
            output,
            "{}  {}  {}    {:<10}{:<16}{:<10}{:<10}{:<14}{:>9}{:>9.0}",
            entry.date,
            entry.start_time.format("%H:%M:%S"),
            entry.end_time.format("%H:%M:%S"),
            entry.machine_id.as_str(),
            entry.operator_id.as_str(),
            entry.operator_name,
            entry.line_number.as_str(),
            entry.mode,
            entry.stitch_count,
            entry.needle_runtime
        )?;
    }
    Ok(output)
}

/// Formats the summary block printed under the table.
pub fn format_summary(summary: &LogSummary) -> Result<String, fmt::Error> {
    let mut output = String::new();
    writeln!(output, "SUMMARY")?;
    writeln!(output, "───────")?;
    writeln!(output, "{:<22}{}", "Logs:", summary.total_logs)?;
    writeln!(output, "{:<22}{:.2}", "Total hours:", summary.total_hours)?;
    for (mode, hours) in summary.mode_hours() {
        writeln!(output, "{:<22}{hours:.2}h", format!("{}:", mode.label()))?;
    }
    writeln!(output, "{:<22}{:.2}%", "Productive time:", summary.productive_percent)?;
    writeln!(output, "{:<22}{:.2}%", "Non-productive time:", summary.npt_percent)?;
    writeln!(output, "{:<22}{}", "Stitch count:", summary.total_stitch_count)?;
    writeln!(output, "{:<22}{:.2}s", "Needle runtime:", summary.total_needle_runtime)?;
    writeln!(output, "{:<22}{:.2}", "Sewing speed:", summary.sewing_speed)?;
    Ok(output)
}

/// Runs the logs command.
pub fn run<S, D>(
    store: &S,
    directory: &D,
    policy: &WorkingHoursPolicy,
    filters: &Filters,
    range: &RangeArgs,
    json: bool,
) -> Result<()>
where
    S: LogStore + ?Sized,
    D: OperatorDirectory + ?Sized,
{
    let listing = list(store, directory, policy, filters, parse_range(range)?)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        print!("{}", format_entries(&listing.logs)?);
        if !listing.logs.is_empty() {
            println!();
            print!("{}", format_summary(&listing.summary)?);
        }
    }
    Ok(())
}
