//! Antimalarial health index: share of a period's units that are antimalarials.

use vrac_shared::{HealthIndexPoint, PeriodRecord, Result, TherapeuticCategory};

use super::{EnrichmentStage, Layer, StageOutput};
use super::category::tally_categories;

/// One [`HealthIndexPoint`] per canonical record.
pub struct HealthIndexStage;

impl EnrichmentStage for HealthIndexStage {
    fn apply(&self, record: &PeriodRecord, _prior: &[Layer]) -> Result<StageOutput> {
        compute_health_index(record).map(StageOutput::HealthIndex)
    }
}

/// Compute the antimalarial share for `record`. The share is 0 when the
/// record sold nothing.
pub fn compute_health_index(record: &PeriodRecord) -> Result<HealthIndexPoint> {
    let antimalarial_quantity = tally_categories(record)?
        .iter()
        .find(|s| s.category == TherapeuticCategory::Antimalarial)
        .map(|s| s.quantity)
        .unwrap_or(0);

    let antimalarial_share = if record.total_quantity == 0 {
        0.0
    } else {
        antimalarial_quantity as f64 / record.total_quantity as f64
    };

    Ok(HealthIndexPoint {
        pharmacy_id: record.pharmacy_id,
        period_label: record.period_label.clone(),
        year: record.year,
        antimalarial_quantity,
        total_quantity: record.total_quantity,
        antimalarial_share,
    })
}

/// Health-index points for every record, in input order.
pub fn health_index_points(records: &[PeriodRecord]) -> Result<Vec<HealthIndexPoint>> {
    records.iter().map(compute_health_index).collect()
}
