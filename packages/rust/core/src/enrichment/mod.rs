//! Enrichment registry and built-in layers.
//!
//! An enrichment stage is a named, pure transform from a canonical
//! [`PeriodRecord`] (plus the layers computed before it) to a
//! [`StageOutput`]. The registry runs stages in registration order and
//! layers their outputs alongside the untouched record.
//!
//! Dependencies between stages are checked once, at registration: a stage
//! can only be registered after every stage it depends on.

mod category;
mod health_index;
mod region;
mod summary;

use tracing::{debug, instrument};

use vrac_shared::{CategorySale, HealthIndexPoint, PeriodRecord, RegionId, Result, VracError};

pub use category::{CategoryBreakdownStage, tally_categories};
pub use health_index::{HealthIndexStage, compute_health_index, health_index_points};
pub use region::RegionStage;
pub use summary::{RegionalSummary, summarize_by_region};

/// Registered name of the region normalization stage.
pub const REGION: &str = "region";
/// Registered name of the antimalarial health-index stage.
pub const HEALTH_INDEX: &str = "health_index";
/// Registered name of the per-category breakdown stage.
pub const CATEGORY_BREAKDOWN: &str = "category_breakdown";

// ---------------------------------------------------------------------------
// Stage outputs
// ---------------------------------------------------------------------------

/// Output of one enrichment stage for one record.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    Region {
        region_id: RegionId,
        region_label: String,
    },
    HealthIndex(HealthIndexPoint),
    CategoryBreakdown(Vec<CategorySale>),
}

/// A stage's output tagged with the stage name.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub stage: String,
    pub output: StageOutput,
}

/// A canonical record with its enrichment layers, in stage order.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPeriod {
    pub record: PeriodRecord,
    pub layers: Vec<Layer>,
}

impl EnrichedPeriod {
    /// Output of the stage registered as `name`.
    pub fn layer(&self, name: &str) -> Option<&StageOutput> {
        self.layers
            .iter()
            .find(|l| l.stage == name)
            .map(|l| &l.output)
    }

    pub fn region(&self) -> Option<(RegionId, &str)> {
        self.layers.iter().find_map(|l| match &l.output {
            StageOutput::Region {
                region_id,
                region_label,
            } => Some((*region_id, region_label.as_str())),
            _ => None,
        })
    }

    pub fn health_index(&self) -> Option<&HealthIndexPoint> {
        self.layers.iter().find_map(|l| match &l.output {
            StageOutput::HealthIndex(point) => Some(point),
            _ => None,
        })
    }

    pub fn categories(&self) -> Option<&[CategorySale]> {
        self.layers.iter().find_map(|l| match &l.output {
            StageOutput::CategoryBreakdown(sales) => Some(sales.as_slice()),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Stage trait
// ---------------------------------------------------------------------------

/// A pure enrichment transform.
pub trait EnrichmentStage: Send + Sync {
    /// Names of stages that must be registered before this one.
    fn depends_on(&self) -> &[&str] {
        &[]
    }

    /// Compute this stage's output. `prior` holds the layers of the stages
    /// registered before this one.
    fn apply(&self, record: &PeriodRecord, prior: &[Layer]) -> Result<StageOutput>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Ordered, named collection of enrichment stages.
#[derive(Default)]
pub struct EnrichmentRegistry {
    stages: Vec<(String, Box<dyn EnrichmentStage>)>,
}

impl EnrichmentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in stages: region, health_index, category_breakdown.
    pub fn with_builtin_stages() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(REGION, Box::new(RegionStage))?;
        registry.register(HEALTH_INDEX, Box::new(HealthIndexStage))?;
        registry.register(CATEGORY_BREAKDOWN, Box::new(CategoryBreakdownStage))?;
        Ok(registry)
    }

    /// Append a stage. Fails on a duplicate name or an unregistered dependency.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        stage: Box<dyn EnrichmentStage>,
    ) -> Result<()> {
        let name = name.into();
        if self.lookup(&name).is_some() {
            return Err(VracError::enrichment(format!(
                "stage {name:?} is already registered"
            )));
        }
        if let Some(missing) = stage
            .depends_on()
            .iter()
            .find(|dep| self.lookup(dep).is_none())
        {
            return Err(VracError::enrichment(format!(
                "stage {name:?} depends on {missing:?}, which is not registered before it"
            )));
        }

        debug!(stage = %name, position = self.stages.len(), "registered enrichment stage");
        self.stages.push((name, stage));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&dyn EnrichmentStage> {
        self.stages
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.as_ref())
    }

    /// Stage names in execution order.
    pub fn list(&self) -> Vec<&str> {
        self.stages.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage over one record, in registration order.
    pub fn enrich(&self, record: &PeriodRecord) -> Result<EnrichedPeriod> {
        let mut layers: Vec<Layer> = Vec::with_capacity(self.stages.len());
        for (name, stage) in &self.stages {
            let output = stage.apply(record, &layers)?;
            layers.push(Layer {
                stage: name.clone(),
                output,
            });
        }
        Ok(EnrichedPeriod {
            record: record.clone(),
            layers,
        })
    }

    /// Enrich each record; the first stage error aborts.
    #[instrument(skip_all, fields(records = records.len(), stages = self.stages.len()))]
    pub fn enrich_all(&self, records: &[PeriodRecord]) -> Result<Vec<EnrichedPeriod>> {
        records.iter().map(|r| self.enrich(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use vrac_shared::{PharmacyId, ProductSale, TherapeuticCategory};

    fn record(pharmacy_id: PharmacyId, products: Vec<ProductSale>) -> PeriodRecord {
        PeriodRecord::new(
            pharmacy_id,
            "Aug–Dec 2024",
            NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 10).unwrap(),
            products,
        )
    }

    struct Marker(&'static [&'static str]);

    impl EnrichmentStage for Marker {
        fn depends_on(&self) -> &[&str] {
            self.0
        }

        fn apply(&self, _record: &PeriodRecord, prior: &[Layer]) -> Result<StageOutput> {
            Ok(StageOutput::CategoryBreakdown(vec![CategorySale {
                category: TherapeuticCategory::Other,
                quantity: prior.len() as u64,
                product_count: 0,
            }]))
        }
    }

    #[test]
    fn builtin_order() {
        let registry = EnrichmentRegistry::with_builtin_stages().unwrap();
        assert_eq!(registry.list(), vec![REGION, HEALTH_INDEX, CATEGORY_BREAKDOWN]);
        assert!(registry.lookup(HEALTH_INDEX).is_some());
        assert!(registry.lookup("nope").is_none());
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut registry = EnrichmentRegistry::new();
        registry.register("a", Box::new(Marker(&[]))).unwrap();
        let err = registry.register("a", Box::new(Marker(&[]))).unwrap_err();
        assert!(err.to_string().contains("already registered"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn dependency_must_be_registered_first() {
        let mut registry = EnrichmentRegistry::new();
        assert!(registry.register("b", Box::new(Marker(&["a"]))).is_err());
        registry.register("a", Box::new(Marker(&[]))).unwrap();
        registry.register("b", Box::new(Marker(&["a"]))).unwrap();
        assert_eq!(registry.list(), vec!["a", "b"]);
    }

    #[test]
    fn stages_run_in_registration_order_and_see_prior_layers() {
        let mut registry = EnrichmentRegistry::new();
        registry.register("first", Box::new(Marker(&[]))).unwrap();
        registry.register("second", Box::new(Marker(&[]))).unwrap();

        let enriched = registry
            .enrich(&record(PharmacyId::Tanda, vec![ProductSale::new("A", "ALPHA", 1)]))
            .unwrap();
        let seen: Vec<(String, u64)> = enriched
            .layers
            .iter()
            .map(|l| match &l.output {
                StageOutput::CategoryBreakdown(sales) => (l.stage.clone(), sales[0].quantity),
                other => panic!("unexpected output {other:?}"),
            })
            .collect();
        assert_eq!(seen, vec![("first".to_string(), 0), ("second".to_string(), 1)]);
    }

    #[test]
    fn builtin_layers_leave_record_untouched() {
        let original = record(
            PharmacyId::Prolife,
            vec![
                ProductSale::new("A", "COARTEM", 300),
                ProductSale::new("B", "PARACETAMOL", 1200),
            ],
        );
        let registry = EnrichmentRegistry::with_builtin_stages().unwrap();
        let enriched = registry.enrich(&original).unwrap();

        assert_eq!(enriched.record, original);
        assert_eq!(
            enriched.region(),
            Some((RegionId::Gontougo, "Gontougo (cocoa)"))
        );
        let point = enriched.health_index().unwrap();
        assert_eq!(point.antimalarial_share, 0.2);
        assert_eq!(enriched.categories().unwrap().len(), 4);
        assert!(enriched.layer(CATEGORY_BREAKDOWN).is_some());
    }
}
