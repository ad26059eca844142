//! Shared utilities for CLI commands.

use anyhow::Result;
use sm_core::DateRange;

use crate::RangeArgs;

/// Parses `--from`/`--to` into a date range. Blank values leave a side open.
pub fn parse_range(args: &RangeArgs) -> Result<DateRange> {
    Ok(DateRange::parse(args.from.as_deref(), args.to.as_deref())?)
}

/// Human description of a range for report headers.
pub fn describe_range(range: &DateRange) -> String {
    match (range.from, range.to) {
        (Some(from), Some(to)) => format!("{from} to {to}"),
        (Some(from), None) => format!("From {from}"),
        (None, Some(to)) => format!("Through {to}"),
        (None, None) => "All dates".to_string(),
    }
}

/// Whether a report argument selects every entity.
pub fn is_all(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("all")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(from: Option<&str>, to: Option<&str>) -> RangeArgs {
        RangeArgs {
            from: from.map(str::to_string),
            to: to.map(str::to_string),
        }
    }

    #[test]
    fn test_describe_range() {
        let closed = parse_range(&args(Some("2025-01-06"), Some("2025-01-07"))).unwrap();
        assert_eq!(describe_range(&closed), "2025-01-06 to 2025-01-07");

        let open = parse_range(&args(None, Some("2025-01-07"))).unwrap();
        assert_eq!(describe_range(&open), "Through 2025-01-07");

        assert_eq!(describe_range(&DateRange::unbounded()), "All dates");
    }

    #[test]
    fn test_parse_range_rejects_bad_dates() {
        let err = parse_range(&args(Some("06/01/2025"), None)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid date format: 06/01/2025. Use YYYY-MM-DD"
        );
    }

    #[test]
    fn test_is_all() {
        assert!(is_all("All"));
        assert!(is_all("all"));
        assert!(!is_all("Allan"));
    }
}
