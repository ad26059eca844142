//! Efficiency command: each log measured against a standard shift.

use std::fmt::{self, Write};

use anyhow::Result;
use sm_core::efficiency::operator_efficiency;
use sm_core::{EngineError, EntityFilter, LogFilter, LogStore, OperatorEfficiency};

use super::util::parse_range;
use crate::RangeArgs;

pub fn format_efficiency(rows: &[OperatorEfficiency]) -> Result<String, fmt::Error> {
    let mut output = String::new();
    if rows.is_empty() {
        writeln!(output, "No logs recorded in this range.")?;
        return Ok(output);
    }

    writeln!(
        output,
        "{:<10}{:<12}{:<10}{:<10}{:>11}",
        "OPERATOR", "DATE", "START", "END", "EFFICIENCY"
    )?;
    for row in rows {
        writeln!(
            output,
            "{:<10}{}  {}  {}  {:>10.2}%",
            row.operator_id.as_str(),
            row.date,
            row.start_time.format("%H:%M:%S"),
            row.end_time.format("%H:%M:%S"),
            row.efficiency
        )?;
    }
    Ok(output)
}

/// Runs the efficiency command.
pub fn run<S: LogStore + ?Sized>(store: &S, range: &RangeArgs, json: bool) -> Result<()> {
    let filter = LogFilter::new(EntityFilter::All, parse_range(range)?);
    let records = store.fetch(&filter).map_err(EngineError::store)?;
    let rows = operator_efficiency(&records);
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", format_efficiency(&rows)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use insta::assert_snapshot;
    use sm_core::OperatorId;

    #[test]
    fn test_format_efficiency() {
        let rows = vec![OperatorEfficiency {
            operator_id: OperatorId::new("A17").unwrap(),
            date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            start_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
            efficiency: 50.0,
        }];
        assert_snapshot!(format_efficiency(&rows).unwrap(), @r"
        OPERATOR  DATE        START     END        EFFICIENCY
        A17       2025-01-06  22:00:00  02:00:00       50.00%
        ");
    }
}
