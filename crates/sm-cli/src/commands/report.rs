//! Report command for productivity reports.
//!
//! This module implements `sm report` for operators, machines and lines,
//! with human-readable tables or the JSON dashboard contract (`--json`).

use std::fmt::{self, Write};

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use sm_core::report::{
    AllLinesReport, AllMachinesReport, EntityReport, LineSummary, OperatorReport, TimeShare,
};
use sm_core::{
    DateRange, GroupingKey, LineNumber, LogStore, MachineId, OperatorDirectory, OperatorScope,
    OperatorSummary, Report, ReportEngine, ReportRequest, WorkingHoursPolicy,
};

use super::util::{describe_range, is_all, parse_range};
use crate::{ReportOptions, ReportTarget};

// ========== Request Building ==========

/// Maps a report target onto an engine grouping and a header title.
///
/// Returns `None` for the operator summary, which is not a grouped report.
pub fn grouping_for(target: &ReportTarget) -> Result<Option<(GroupingKey, String)>> {
    let grouping = match target {
        ReportTarget::Operator { name, .. } if is_all(name) => (
            GroupingKey::ByOperator(OperatorScope::All),
            "OPERATOR REPORT: all operators".to_string(),
        ),
        ReportTarget::Operator { name, .. } => (
            GroupingKey::ByOperator(OperatorScope::Named(name.trim().to_string())),
            format!("OPERATOR REPORT: {}", name.trim()),
        ),
        ReportTarget::Machine { id, .. } if is_all(id) => {
            (GroupingKey::ByMachineAll, "ALL MACHINES".to_string())
        }
        ReportTarget::Machine { id, .. } => (
            GroupingKey::ByMachine(MachineId::new(id.trim())?),
            format!("MACHINE REPORT: {}", id.trim()),
        ),
        ReportTarget::Line { number, .. } if is_all(number) => {
            (GroupingKey::ByLineAll, "ALL LINES".to_string())
        }
        ReportTarget::Line { number, .. } => (
            GroupingKey::ByLine(LineNumber::new(number.trim())?),
            format!("LINE REPORT: {}", number.trim()),
        ),
        ReportTarget::Operators { .. } => return Ok(None),
    };
    Ok(Some(grouping))
}

const fn options(target: &ReportTarget) -> &ReportOptions {
    match target {
        ReportTarget::Operator { options, .. }
        | ReportTarget::Machine { options, .. }
        | ReportTarget::Line { options, .. }
        | ReportTarget::Operators { options } => options,
    }
}

/// Builds the report for `target` and renders it.
pub fn generate<S, D>(
    engine: &ReportEngine<'_, S, D>,
    target: &ReportTarget,
    now: NaiveDateTime,
) -> Result<String>
where
    S: LogStore + ?Sized,
    D: OperatorDirectory + ?Sized,
{
    let options = options(target);
    let range = parse_range(&options.range)?;

    let Some((grouping, title)) = grouping_for(target)? else {
        let summaries = engine.operator_summary(&range)?;
        return if options.json {
            Ok(serde_json::to_string_pretty(&summaries)?)
        } else {
            Ok(format_summaries(&summaries, &range)?)
        };
    };

    let report = engine.build(&ReportRequest {
        grouping,
        range,
        now,
    })?;
    if options.json {
        Ok(serde_json::to_string_pretty(&report)?)
    } else {
        Ok(format_report(&report, &title, &range)?)
    }
}

// ========== Human Output ==========

/// Formats any report as fixed-width tables and a summary block.
pub fn format_report(report: &Report, title: &str, range: &DateRange) -> Result<String, fmt::Error> {
    let mut output = String::new();
    writeln!(output, "{title}")?;
    writeln!(output, "{}", describe_range(range))?;

    match report {
        Report::Operator(report) => write_operator(&mut output, report)?,
        Report::Machine(report) | Report::Line(report) => write_entity(&mut output, report)?,
        Report::AllMachines(report) => write_all_machines(&mut output, report)?,
        Report::AllLines(report) => write_all_lines(&mut output, report)?,
    }
    Ok(output)
}

fn write_empty(output: &mut String) -> fmt::Result {
    writeln!(output)?;
    writeln!(output, "No logs recorded in this range.")
}

fn write_share(output: &mut String, label: &str, share: &TimeShare) -> fmt::Result {
    writeln!(
        output,
        "{label:<22}{:.2}h ({:.2}%)",
        share.hours, share.percentage
    )?;
    if let Some(breakdown) = &share.breakdown {
        writeln!(output, "{:<22}{:.2}h", "  No feeding:", breakdown.no_feeding_hours)?;
        writeln!(output, "{:<22}{:.2}h", "  Meeting:", breakdown.meeting_hours)?;
        writeln!(output, "{:<22}{:.2}h", "  Maintenance:", breakdown.maintenance_hours)?;
        writeln!(output, "{:<22}{:.2}h", "  Idle:", breakdown.idle_hours)?;
    }
    Ok(())
}

fn write_entity(output: &mut String, report: &EntityReport) -> fmt::Result {
    if report.table_data.is_empty() {
        return write_empty(output);
    }

    writeln!(output)?;
    write!(
        output,
        "{:<10}{:>9}{:>9}{:>9}{:>9}{:>9}{:>9}{:>9}{:>9}",
        "DATE", "SEWING", "NO FEED", "MEETING", "MAINT", "IDLE", "TOTAL", "PT %", "NPT %"
    )?;
    if report.line.is_some() {
        write!(output, "{:>10}", "MACHINES")?;
    }
    writeln!(output)?;

    for row in &report.table_data {
        write!(
            output,
            "{}{:>9.2}{:>9.2}{:>9.2}{:>9.2}{:>9.2}{:>9.2}{:>9.2}{:>9.2}",
            row.date,
            row.sewing_hours,
            row.no_feeding_hours,
            row.meeting_hours,
            row.maintenance_hours,
            row.idle_hours,
            row.total_hours,
            row.production_percentage,
            row.npt_percentage
        )?;
        if let Some(count) = row.machine_count {
            write!(output, "{count:>10}")?;
        }
        writeln!(output)?;
    }

    writeln!(output)?;
    writeln!(output, "SUMMARY")?;
    writeln!(output, "───────")?;
    writeln!(output, "{:<22}{}", "Working days:", report.total_working_days)?;
    writeln!(output, "{:<22}{:.2}", "Available hours:", report.total_available_hours)?;
    writeln!(output, "{:<22}{:.2}", "Total hours:", report.total_hours)?;
    write_share(output, "Productive time:", &report.total_productive_time)?;
    write_share(output, "Non-productive time:", &report.total_non_productive_time)?;
    if let Some(line) = &report.line {
        writeln!(output, "{:<22}{:.2}", "Ideal hours:", line.total_ideal_hours)?;
        writeln!(output, "{:<22}{:.2}%", "Utilization:", line.utilization_percentage)?;
        writeln!(output, "{:<22}{:.2}", "Average machines:", line.average_machines)?;
    }
    writeln!(output, "{:<22}{}", "Stitch count:", report.total_stitch_count)?;
    writeln!(output, "{:<22}{:.2}", "Sewing speed:", report.average_sewing_speed)?;
    writeln!(
        output,
        "{:<22}{:.2}s (avg {:.2}s, {:.2}%)",
        "Needle runtime:",
        report.total_needle_runtime,
        report.average_needle_runtime,
        report.needle_runtime_percentage
    )
}

fn write_operator(output: &mut String, report: &OperatorReport) -> fmt::Result {
    if report.table_data.is_empty() {
        return write_empty(output);
    }

    writeln!(output)?;
    writeln!(
        output,
        "{:<10}  {:<10}{:<16}{:>8}{:>8}{:>8}{:>9}{:>9}{:>8}{:>8}{:>8}",
        "DATE", "OPERATOR", "NAME", "TOTAL", "SEWING", "IDLE", "MEETING", "NO FEED", "MAINT",
        "PT %", "NPT %"
    )?;
    for row in &report.table_data {
        writeln!(
            output,
            "{}  {:<10}{:<16}{:>8.2}{:>8.2}{:>8.2}{:>9.2}{:>9.2}{:>8.2}{:>8.2}{:>8.2}",
            row.date,
            row.operator_id.as_str(),
            row.operator_name,
            row.total_hours,
            row.sewing_hours,
            row.idle_hours,
            row.meeting_hours,
            row.no_feeding_hours,
            row.maintenance_hours,
            row.production_percentage,
            row.npt_percentage
        )?;
    }

    writeln!(output)?;
    writeln!(output, "SUMMARY")?;
    writeln!(output, "───────")?;
    writeln!(output, "{:<22}{:.2}", "Total hours:", report.total_hours)?;
    writeln!(
        output,
        "{:<22}{:.2}h ({:.2}%)",
        "Production:", report.total_production_hours, report.production_percentage
    )?;
    writeln!(
        output,
        "{:<22}{:.2}h ({:.2}%)",
        "Non-production:", report.total_non_production_hours, report.npt_percentage
    )?;
    writeln!(output, "{:<22}{:.2}h", "  Idle:", report.total_idle_hours)?;
    writeln!(output, "{:<22}{}", "Stitch count:", report.total_stitch_count)?;
    writeln!(output, "{:<22}{:.2}", "Sewing speed:", report.average_sewing_speed)?;
    writeln!(
        output,
        "{:<22}{:.2}s (avg {:.2}s, {:.2}%)",
        "Needle runtime:",
        report.total_needle_runtime,
        report.average_needle_runtime,
        report.needle_runtime_percentage
    )
}

fn write_all_machines(output: &mut String, report: &AllMachinesReport) -> fmt::Result {
    if report.all_machines_report.is_empty() {
        return write_empty(output);
    }

    writeln!(output)?;
    writeln!(
        output,
        "{:<12}{:>6}{:>11}{:>9}{:>9}{:>9}{:>9}{:>10}",
        "MACHINE", "DAYS", "AVAILABLE", "TOTAL", "SEWING", "PT %", "NPT %", "STITCHES"
    )?;
    for machine in &report.all_machines_report {
        let id = machine.machine_id.as_ref().map_or("", MachineId::as_str);
        writeln!(
            output,
            "{id:<12}{:>6}{:>11.2}{:>9.2}{:>9.2}{:>9.2}{:>9.2}{:>10}",
            machine.total_working_days,
            machine.total_available_hours,
            machine.total_hours,
            machine.total_productive_time.hours,
            machine.total_productive_time.percentage,
            machine.total_non_productive_time.percentage,
            machine.total_stitch_count
        )?;
    }

    writeln!(output)?;
    writeln!(output, "{:<22}{}", "Machines:", report.total_machines)
}

fn write_line_summary(output: &mut String, summary: &LineSummary) -> fmt::Result {
    writeln!(output, "{:<22}{}", "Lines:", summary.total_lines)?;
    writeln!(output, "{:<22}{}", "Working days:", summary.total_working_days)?;
    writeln!(output, "{:<22}{:.2}", "Total hours:", summary.total_hours)?;
    write_share(output, "Productive time:", &summary.total_productive_time)?;
    write_share(output, "Non-productive time:", &summary.total_non_productive_time)?;
    writeln!(output, "{:<22}{:.2}", "Ideal hours:", summary.total_ideal_hours)?;
    writeln!(output, "{:<22}{:.2}%", "Utilization:", summary.utilization_percentage)?;
    writeln!(output, "{:<22}{:.2}", "Average machines:", summary.average_machines)?;
    writeln!(output, "{:<22}{}", "Stitch count:", summary.total_stitch_count)?;
    writeln!(output, "{:<22}{:.2}", "Sewing speed:", summary.average_sewing_speed)?;
    writeln!(
        output,
        "{:<22}{:.2}s ({:.2}%)",
        "Needle runtime:", summary.total_needle_runtime, summary.needle_runtime_percentage
    )
}

fn write_all_lines(output: &mut String, report: &AllLinesReport) -> fmt::Result {
    if report.all_lines_report.is_empty() {
        return write_empty(output);
    }

    writeln!(output)?;
    writeln!(
        output,
        "{:<8}{:>6}{:>10}{:>9}{:>9}{:>9}{:>9}{:>10}",
        "LINE", "DAYS", "MACHINES", "TOTAL", "SEWING", "PT %", "NPT %", "STITCHES"
    )?;
    for line in &report.all_lines_report {
        let number = line.line_number.as_ref().map_or("", LineNumber::as_str);
        let machines = line.line.as_ref().map_or(0.0, |l| l.average_machines);
        writeln!(
            output,
            "{number:<8}{:>6}{machines:>10.2}{:>9.2}{:>9.2}{:>9.2}{:>9.2}{:>10}",
            line.total_working_days,
            line.total_hours,
            line.total_productive_time.hours,
            line.total_productive_time.percentage,
            line.total_non_productive_time.percentage,
            line.total_stitch_count
        )?;
    }

    writeln!(output)?;
    writeln!(output, "SUMMARY")?;
    writeln!(output, "───────")?;
    write_line_summary(output, &report.summary)
}

/// Formats the all-operator summary.
pub fn format_summaries(summaries: &[OperatorSummary], range: &DateRange) -> Result<String, fmt::Error> {
    let mut output = String::new();
    writeln!(output, "OPERATOR SUMMARY")?;
    writeln!(output, "{}", describe_range(range))?;

    if summaries.is_empty() {
        write_empty(&mut output)?;
        return Ok(output);
    }

    writeln!(output)?;
    writeln!(
        output,
        "{:<10}{:<16}{:>12}{:>12}{:>9}{:>9}",
        "OPERATOR", "NAME", "PRODUCTION", "NON-PROD", "PT %", "NPT %"
    )?;
    for summary in summaries {
        writeln!(
            output,
            "{:<10}{:<16}{:>12.2}{:>12.2}{:>9.2}{:>9.2}",
            summary.operator_id.as_str(),
            summary.operator_name,
            summary.total_production_hours,
            summary.total_non_production_hours,
            summary.production_percentage,
            summary.npt_percentage
        )?;
    }
    Ok(output)
}

// ========== Public Interface ==========

/// Runs the report command.
pub fn run<S, D>(store: &S, directory: &D, policy: &WorkingHoursPolicy, target: &ReportTarget) -> Result<()>
where
    S: LogStore + ?Sized,
    D: OperatorDirectory + ?Sized,
{
    let engine = ReportEngine::new(store, directory, policy);
    let now = Local::now().naive_local();
    let output = generate(&engine, target, now)?;

    if options(target).json {
        println!("{output}");
    } else {
        print!("{output}");
    }
    Ok(())
}
