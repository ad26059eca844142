//! Stats command: fleet counts and needle efficiency per line.

use std::fmt::{self, Write};

use anyhow::Result;
use serde::Serialize;
use sm_core::efficiency::line_efficiency;
use sm_core::{EngineError, EntityFilter, FleetCounts, LineEfficiency, LogFilter, LogStore};

use super::util::parse_range;
use crate::RangeArgs;

/// Everything `sm stats` shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetStats {
    #[serde(flatten)]
    pub counts: FleetCounts,
    pub lines_efficiency: Vec<LineEfficiency>,
}

pub fn collect<S: LogStore + ?Sized>(store: &S, filter: &LogFilter) -> Result<FleetStats> {
    let records = store.fetch(filter).map_err(EngineError::store)?;
    Ok(FleetStats {
        counts: FleetCounts::from_records(&records),
        lines_efficiency: line_efficiency(&records),
    })
}

pub fn format_stats(stats: &FleetStats) -> Result<String, fmt::Error> {
    let mut output = String::new();
    writeln!(output, "FLEET")?;
    writeln!(output, "─────")?;
    writeln!(output, "{:<28}{}", "Machines:", stats.counts.machines)?;
    writeln!(output, "{:<28}{}", "Lines:", stats.counts.lines)?;
    writeln!(
        output,
        "{:<28}{}",
        "Underperforming operators:", stats.counts.underperforming_operators
    )?;

    if stats.lines_efficiency.is_empty() {
        return Ok(output);
    }

    writeln!(output)?;
    writeln!(output, "{:<8}{:>10}{:>12}", "LINE", "MACHINES", "EFFICIENCY")?;
    for line in &stats.lines_efficiency {
        writeln!(
            output,
            "{:<8}{:>10}{:>11.2}%",
            line.line_number.as_str(),
            line.total_machines,
            line.efficiency
        )?;
    }
    Ok(output)
}

/// Runs the stats command.
pub fn run<S: LogStore + ?Sized>(store: &S, range: &RangeArgs, json: bool) -> Result<()> {
    let filter = LogFilter::new(EntityFilter::All, parse_range(range)?);
    let stats = collect(store, &filter)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", format_stats(&stats)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use sm_core::LineNumber;

    #[test]
    fn test_format_stats() {
        let stats = FleetStats {
            counts: FleetCounts {
                machines: 3,
                lines: 2,
                underperforming_operators: 1,
            },
            lines_efficiency: vec![
                LineEfficiency {
                    line_number: LineNumber::new("1").unwrap(),
                    total_machines: 2,
                    efficiency: 75.0,
                },
                LineEfficiency {
                    line_number: LineNumber::new("2").unwrap(),
                    total_machines: 1,
                    efficiency: 0.0,
                },
            ],
        };
        assert_snapshot!(format_stats(&stats).unwrap(), @r"
        FLEET
        ─────
        Machines:                   3
        Lines:                      2
        Underperforming operators:  1

        LINE      MACHINES  EFFICIENCY
        1                2      75.00%
        2                1       0.00%
        ");
    }

    #[test]
    fn test_stats_json_flattens_counts() {
        let stats = FleetStats {
            counts: FleetCounts::default(),
            lines_efficiency: Vec::new(),
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["machines"], 0);
        assert_eq!(value["underperforming_operators"], 0);
        assert!(value["lines_efficiency"].as_array().unwrap().is_empty());
    }
}
