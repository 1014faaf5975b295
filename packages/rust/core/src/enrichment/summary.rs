//! Region-keyed aggregation over enriched periods.

use std::collections::BTreeMap;

use serde::Serialize;

use vrac_shared::{PharmacyId, RegionId, Result, VracError};

use super::{EnrichedPeriod, HEALTH_INDEX, REGION};

/// Antimalarial totals for one `(region, year)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionalSummary {
    pub region_id: RegionId,
    pub region_label: String,
    pub year: i32,
    pub pharmacies: Vec<PharmacyId>,
    pub antimalarial_quantity: u64,
    pub total_quantity: u64,
    pub antimalarial_share: f64,
}

/// Sum antimalarial and total quantities per `(region, year)`.
///
/// Needs the `region` and `health_index` layers on every period. Output is
/// sorted by region, then year descending.
pub fn summarize_by_region(periods: &[EnrichedPeriod]) -> Result<Vec<RegionalSummary>> {
    let mut groups: BTreeMap<(RegionId, std::cmp::Reverse<i32>), RegionalSummary> = BTreeMap::new();

    for period in periods {
        let key = period.record.key();
        let (region_id, region_label) = period.region().ok_or_else(|| {
            VracError::enrichment(format!("{key}: missing {REGION:?} layer"))
        })?;
        let point = period.health_index().ok_or_else(|| {
            VracError::enrichment(format!("{key}: missing {HEALTH_INDEX:?} layer"))
        })?;

        let entry = groups
            .entry((region_id, std::cmp::Reverse(point.year)))
            .or_insert_with(|| RegionalSummary {
                region_id,
                region_label: region_label.to_string(),
                year: point.year,
                pharmacies: Vec::new(),
                antimalarial_quantity: 0,
                total_quantity: 0,
                antimalarial_share: 0.0,
            });
        if !entry.pharmacies.contains(&point.pharmacy_id) {
            entry.pharmacies.push(point.pharmacy_id);
        }
        let overflow = || VracError::validation(format!("{key}: regional totals overflow"));
        entry.antimalarial_quantity = entry
            .antimalarial_quantity
            .checked_add(point.antimalarial_quantity)
            .ok_or_else(overflow)?;
        entry.total_quantity = entry
            .total_quantity
            .checked_add(point.total_quantity)
            .ok_or_else(overflow)?;
    }

    Ok(groups
        .into_values()
        .map(|mut summary| {
            summary.pharmacies.sort();
            if summary.total_quantity > 0 {
                summary.antimalarial_share =
                    summary.antimalarial_quantity as f64 / summary.total_quantity as f64;
            }
            summary
        })
        .collect())
}
