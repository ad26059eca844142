//! Ids command: which machines, lines or operators were active.

use anyhow::Result;
use sm_core::{EntityKind, LogStore, active_ids};

use super::util::parse_range;
use crate::RangeArgs;

/// Prints one id per line.
pub fn run<S: LogStore + ?Sized>(store: &S, kind: EntityKind, range: &RangeArgs) -> Result<()> {
    let range = parse_range(range)?;
    let ids = active_ids(store, kind, &range)?;
    tracing::debug!(%kind, count = ids.len(), "listed active ids");
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sm_core::EngineError;
    use sm_db::Database;

    #[test]
    fn test_ids_require_both_dates() {
        let db = Database::open_in_memory().unwrap();
        let range = RangeArgs {
            from: Some("2025-01-01".to_string()),
            to: None,
        };
        let err = run(&db, EntityKind::Machine, &range).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::MissingRequiredField { field: "to_date" })
        ));
    }
}
