//! Health-index CSV export.

use vrac_shared::{HealthIndexPoint, Result, VracError};

/// Column header of the health-index export.
pub const HEALTH_INDEX_CSV_HEADER: &str =
    "Pharmacy,Period,Year,Antimalarial Quantity,Total Quantity,Antimalarial Share (%)";

/// Render health-index points as CSV. The share is written as a percentage
/// with two decimals.
pub fn render_health_index_csv(points: &[HealthIndexPoint]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(HEALTH_INDEX_CSV_HEADER.split(','))
        .map_err(csv_error)?;

    for point in points {
        writer
            .write_record([
                point.pharmacy_id.as_str().to_string(),
                point.period_label.clone(),
                point.year.to_string(),
                point.antimalarial_quantity.to_string(),
                point.total_quantity.to_string(),
                format!("{:.2}", point.antimalarial_share * 100.0),
            ])
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| VracError::Serialization(format!("health index csv: {e}")))?;
    String::from_utf8(bytes).map_err(|e| VracError::Serialization(format!("health index csv: {e}")))
}

fn csv_error(e: csv::Error) -> VracError {
    VracError::Serialization(format!("health index csv: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vrac_shared::PharmacyId;

    fn point(pharmacy_id: PharmacyId, label: &str, am: u64, total: u64, share: f64) -> HealthIndexPoint {
        HealthIndexPoint {
            pharmacy_id,
            period_label: label.into(),
            year: 2024,
            antimalarial_quantity: am,
            total_quantity: total,
            antimalarial_share: share,
        }
    }

    #[test]
    fn renders_header_and_percentages() {
        let csv = render_health_index_csv(&[
            point(PharmacyId::Tanda, "Aug–Dec 2024", 300, 1500, 0.2),
            point(PharmacyId::Prolife, "Aug–Dec 2024", 1, 3, 1.0 / 3.0),
            point(PharmacyId::Olympique, "Aug–Dec 2024", 0, 0, 0.0),
        ])
        .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], HEALTH_INDEX_CSV_HEADER);
        assert_eq!(lines[1], "tanda,Aug–Dec 2024,2024,300,1500,20.00");
        assert_eq!(lines[2], "prolife,Aug–Dec 2024,2024,1,3,33.33");
        assert_eq!(lines[3], "olympique,Aug–Dec 2024,2024,0,0,0.00");
    }

    #[test]
    fn quotes_labels_with_commas() {
        let csv = render_health_index_csv(&[
            point(PharmacyId::Attobrou, "Aug, Dec", 1, 2, 0.5),
            point(PharmacyId::Tanda, "say \"hi\"", 1, 2, 0.5),
        ])
        .unwrap();
        assert!(csv.contains("attobrou,\"Aug, Dec\",2024,1,2,50.00"));
        assert!(csv.contains("tanda,\"say \"\"hi\"\"\",2024,1,2,50.00"));
    }

    #[test]
    fn empty_input_is_header_only() {
        assert_eq!(
            render_health_index_csv(&[]).unwrap(),
            format!("{HEALTH_INDEX_CSV_HEADER}\n")
        );
    }
}
