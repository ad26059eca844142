//! One-line-per-operator production summary.

use serde::Serialize;

use crate::aggregate::group_by;
use crate::classify::classify;
use crate::error::EngineError;
use crate::report::{ReportEngine, percentage, round2};
use crate::store::{DateRange, EntityFilter, LogStore, OperatorDirectory};
use crate::types::OperatorId;

/// Production versus non-production for one operator over a date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorSummary {
    pub operator_id: OperatorId,
    pub operator_name: String,
    pub total_production_hours: f64,
    pub total_non_production_hours: f64,
    pub production_percentage: f64,
    pub npt_percentage: f64,
}

impl<S, D> ReportEngine<'_, S, D>
where
    S: LogStore + ?Sized,
    D: OperatorDirectory + ?Sized,
{
    /// Summarizes every operator with logs in `range`.
    ///
    /// Each working day counts `operator_summary_daily_hours`, and everything
    /// that is not sewing is non-production. Sewing beyond that allowance
    /// makes non-production hours and NPT% negative. Cards that are not in the
    /// directory are skipped.
    #[allow(clippy::cast_precision_loss)]
    pub fn operator_summary(&self, range: &DateRange) -> Result<Vec<OperatorSummary>, EngineError> {
        let policy = self.policy();

        let mut records = self.fetch(EntityFilter::All, range)?;
        records.retain(|r| !r.operator_id.is_unassigned());
        let classified = classify(policy, &records);
        let per_operator = group_by(&classified, |c| c.record.operator_id.clone());

        let mut summaries = Vec::with_capacity(per_operator.len());
        for (operator_id, totals) in per_operator {
            let Some(operator) = self
                .directory()
                .lookup(&operator_id)
                .map_err(EngineError::store)?
            else {
                tracing::warn!(%operator_id, "skipping operator missing from directory");
                continue;
            };

            let available = policy.operator_summary_daily_hours * totals.working_days() as f64;
            let production = totals.sewing_hours;
            let non_production = available - production;
            let production_percentage = percentage(production, available);
            let npt_percentage = if available > 0.0 {
                100.0 - production_percentage
            } else {
                0.0
            };

            summaries.push(OperatorSummary {
                operator_id,
                operator_name: operator.name,
                total_production_hours: round2(production),
                total_non_production_hours: round2(non_production),
                production_percentage: round2(production_percentage),
                npt_percentage: round2(npt_percentage),
            });
        }
        Ok(summaries)
    }
}
