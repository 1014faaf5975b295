//! Region normalization: pharmacy id → region from the static profile table.

use vrac_shared::{PeriodRecord, Result};

use super::{EnrichmentStage, Layer, StageOutput};

/// Attaches the pharmacy's region id and display label.
pub struct RegionStage;

impl EnrichmentStage for RegionStage {
    fn apply(&self, record: &PeriodRecord, _prior: &[Layer]) -> Result<StageOutput> {
        let profile = record.pharmacy_id.profile();
        Ok(StageOutput::Region {
            region_id: profile.region,
            region_label: profile.region_label.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use vrac_shared::{PharmacyId, RegionId};

    #[test]
    fn every_pharmacy_has_a_region() {
        let expected = [
            (PharmacyId::Tanda, RegionId::Gontougo, "Gontougo (cocoa)"),
            (PharmacyId::Prolife, RegionId::Gontougo, "Gontougo (cocoa)"),
            (PharmacyId::Olympique, RegionId::Abidjan, "Abidjan (urban)"),
            (PharmacyId::Attobrou, RegionId::LaMe, "La Mé (cocoa)"),
        ];
        for (pharmacy_id, region_id, label) in expected {
            let record = PeriodRecord::new(
                pharmacy_id,
                "Aug–Dec 2024",
                NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 12, 10).unwrap(),
                vec![],
            );
            assert_eq!(
                RegionStage.apply(&record, &[]).unwrap(),
                StageOutput::Region {
                    region_id,
                    region_label: label.to_string()
                }
            );
        }
    }
}
