//! Core domain types for the VRAC pharmacy surveillance dataset.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Pharmacies and regions
// ---------------------------------------------------------------------------

/// Known pharmacies in the surveillance network.
///
/// Declared in alphabetical order of their wire identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PharmacyId {
    Attobrou,
    Olympique,
    Prolife,
    Tanda,
}

impl PharmacyId {
    /// All pharmacies, in identifier order.
    pub const ALL: [PharmacyId; 4] = [
        PharmacyId::Attobrou,
        PharmacyId::Olympique,
        PharmacyId::Prolife,
        PharmacyId::Tanda,
    ];

    /// Wire identifier (`"tanda"`, `"prolife"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attobrou => "attobrou",
            Self::Olympique => "olympique",
            Self::Prolife => "prolife",
            Self::Tanda => "tanda",
        }
    }

    /// Static reference profile for this pharmacy.
    pub fn profile(&self) -> &'static PharmacyProfile {
        PHARMACY_PROFILES
            .iter()
            .find(|p| p.id == *self)
            .unwrap_or_else(|| unreachable!("every PharmacyId has a profile"))
    }
}

impl std::fmt::Display for PharmacyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PharmacyId {
    type Err = crate::VracError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PharmacyId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::VracError::validation(format!("unknown pharmacy id '{s}'")))
    }
}

/// Health regions the pharmacies belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionId {
    Abidjan,
    Gontougo,
    LaMe,
}

impl RegionId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Abidjan => "abidjan",
            Self::Gontougo => "gontougo",
            Self::LaMe => "la_me",
        }
    }
}

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static reference data for a pharmacy. Not derived from input files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyProfile {
    pub id: PharmacyId,
    pub name: &'static str,
    pub region: RegionId,
    pub location: &'static str,
    pub region_label: &'static str,
}

/// The pharmacy reference table.
pub static PHARMACY_PROFILES: [PharmacyProfile; 4] = [
    PharmacyProfile {
        id: PharmacyId::Tanda,
        name: "Grande Pharmacie de Tanda",
        region: RegionId::Gontougo,
        location: "Tanda, Gontougo",
        region_label: "Gontougo (cocoa)",
    },
    PharmacyProfile {
        id: PharmacyId::Prolife,
        name: "Pharmacie Prolife",
        region: RegionId::Gontougo,
        location: "Tabagne, Gontougo",
        region_label: "Gontougo (cocoa)",
    },
    PharmacyProfile {
        id: PharmacyId::Olympique,
        name: "Pharmacie Olympique",
        region: RegionId::Abidjan,
        location: "Abidjan",
        region_label: "Abidjan (urban)",
    },
    PharmacyProfile {
        id: PharmacyId::Attobrou,
        name: "Pharmacie Attobrou",
        region: RegionId::LaMe,
        location: "La Mé",
        region_label: "La Mé (cocoa)",
    },
];

// ---------------------------------------------------------------------------
// Dialects
// ---------------------------------------------------------------------------

/// The two export formats produced by the point-of-sale system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// `ETAT_2080QTE`: top-N products ranked by quantity.
    RankLimited,
    /// `ETAT_ListeProduitsVendus`: every product sold in the period.
    FullCatalog,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RankLimited => "rank-limited",
            Self::FullCatalog => "full-catalog",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Sales records
// ---------------------------------------------------------------------------

/// One product row from an export file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSale {
    pub code: String,
    pub designation: String,
    pub quantity_sold: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl ProductSale {
    /// A sale with no stock/price information.
    pub fn new(code: impl Into<String>, designation: impl Into<String>, quantity_sold: u64) -> Self {
        Self {
            code: code.into(),
            designation: designation.into(),
            quantity_sold,
            stock: None,
            price: None,
        }
    }
}

/// What the source registry expects a file to contain.
///
/// Parsers use the label as-is and fall back to the hinted year when the
/// file carries no period statement. Pharmacy identity always comes from
/// the file text; the hinted pharmacy is only used to flag disagreements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingHints {
    pub pharmacy_id: PharmacyId,
    pub period_label: String,
    pub year: i32,
}

/// Deduplication key: one canonical record survives per `(pharmacy, year)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeriodKey {
    pub pharmacy_id: PharmacyId,
    pub year: i32,
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.pharmacy_id, self.year)
    }
}

/// Sales for one pharmacy over one reporting period, from one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodRecord {
    pub pharmacy_id: PharmacyId,
    pub period_label: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub year: i32,
    pub products: Vec<ProductSale>,
    pub total_quantity: u64,
}

impl PeriodRecord {
    /// Build a record; `year` comes from the period end and `total_quantity`
    /// is the sum over `products`, saturating at `u64::MAX`. Use
    /// [`checked_total`](Self::checked_total) to reject tables that overflow.
    pub fn new(
        pharmacy_id: PharmacyId,
        period_label: impl Into<String>,
        period_start: NaiveDate,
        period_end: NaiveDate,
        products: Vec<ProductSale>,
    ) -> Self {
        let total_quantity = products
            .iter()
            .fold(0u64, |acc, p| acc.saturating_add(p.quantity_sold));
        Self {
            pharmacy_id,
            period_label: period_label.into(),
            period_start,
            period_end,
            year: period_end.year(),
            products,
            total_quantity,
        }
    }

    /// Sum of `quantity_sold` over `products`, or `None` on overflow.
    pub fn checked_total(products: &[ProductSale]) -> Option<u64> {
        products
            .iter()
            .try_fold(0u64, |acc, p| acc.checked_add(p.quantity_sold))
    }

    pub fn key(&self) -> PeriodKey {
        PeriodKey {
            pharmacy_id: self.pharmacy_id,
            year: self.year,
        }
    }
}

// ---------------------------------------------------------------------------
// Derived data
// ---------------------------------------------------------------------------

/// Therapeutic category of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TherapeuticCategory {
    Antimalarial,
    Antibiotic,
    Analgesic,
    Other,
}

impl TherapeuticCategory {
    pub const ALL: [TherapeuticCategory; 4] = [
        TherapeuticCategory::Antimalarial,
        TherapeuticCategory::Antibiotic,
        TherapeuticCategory::Analgesic,
        TherapeuticCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Antimalarial => "antimalarial",
            Self::Antibiotic => "antibiotic",
            Self::Analgesic => "analgesic",
            Self::Other => "other",
        }
    }
}

/// Quantity and product count for one category within a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySale {
    pub category: TherapeuticCategory,
    pub quantity: u64,
    pub product_count: usize,
}

/// Antimalarial share for one canonical period record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthIndexPoint {
    pub pharmacy_id: PharmacyId,
    pub period_label: String,
    pub year: i32,
    pub antimalarial_quantity: u64,
    pub total_quantity: u64,
    /// In `[0, 1]`; exactly 0 when `total_quantity` is 0.
    pub antimalarial_share: f64,
}

// ---------------------------------------------------------------------------
// Output artifact
// ---------------------------------------------------------------------------

/// The serialized pipeline output. Exactly two top-level fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutputDocument {
    pub periods: Vec<PeriodRecord>,
    pub processed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn pharmacy_id_roundtrip() {
        for id in PharmacyId::ALL {
            let parsed: PharmacyId = id.as_str().parse().expect("parse PharmacyId");
            assert_eq!(parsed, id);
            assert_eq!(id.profile().id, id);
        }
        assert!("nowhere".parse::<PharmacyId>().is_err());
    }

    #[test]
    fn pharmacy_order_matches_identifier_order() {
        let mut ids = PharmacyId::ALL.to_vec();
        ids.sort();
        let names: Vec<_> = ids.iter().map(|i| i.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn period_record_derives_year_and_total() {
        let record = PeriodRecord::new(
            PharmacyId::Tanda,
            "Aug–Dec 2024",
            date(2024, 8, 1),
            date(2024, 12, 10),
            vec![ProductSale::new("A1", "ALPHA", 10), ProductSale::new("B2", "BETA", 32)],
        );
        assert_eq!(record.year, 2024);
        assert_eq!(record.total_quantity, 42);
        assert_eq!(record.key().to_string(), "tanda/2024");
    }

    #[test]
    fn period_total_never_overflows() {
        let big = vec![
            ProductSale::new("A1", "ALPHA", u64::MAX - 1),
            ProductSale::new("B2", "BETA", 5),
        ];
        assert_eq!(PeriodRecord::checked_total(&big), None);
        assert_eq!(
            PeriodRecord::checked_total(&[ProductSale::new("A1", "ALPHA", 7)]),
            Some(7)
        );

        let record = PeriodRecord::new(PharmacyId::Tanda, "x", date(2024, 8, 1), date(2024, 12, 10), big);
        assert_eq!(record.total_quantity, u64::MAX);
    }

    #[test]
    fn period_record_wire_format() {
        let mut sale = ProductSale::new("C3", "GAMMA", 5);
        sale.stock = Some(12.0);
        let record = PeriodRecord::new(
            PharmacyId::Prolife,
            "Aug–Dec 2023",
            date(2023, 8, 1),
            date(2023, 12, 10),
            vec![sale, ProductSale::new("D4", "DELTA", 1)],
        );

        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["pharmacyId"], "prolife");
        assert_eq!(json["periodStart"], "2023-08-01");
        assert_eq!(json["periodEnd"], "2023-12-10");
        assert_eq!(json["totalQuantity"], 6);
        assert_eq!(json["products"][0]["quantitySold"], 5);
        assert_eq!(json["products"][0]["stock"], 12.0);
        assert!(json["products"][1].get("stock").is_none());
        assert!(json["products"][1].get("price").is_none());
    }

    #[test]
    fn output_document_has_two_fields() {
        let doc = OutputDocument {
            periods: vec![],
            processed_at: Utc::now(),
        };
        let json = serde_json::to_value(&doc).expect("serialize");
        let obj = json.as_object().expect("object");
        assert_eq!(obj.len(), 2);
        assert!(obj.contains_key("periods"));
        assert!(obj.contains_key("processedAt"));
    }
}
