//! Per-category quantity and product-count breakdown.

use vrac_shared::{CategorySale, PeriodRecord, Result, TherapeuticCategory, VracError};

use super::{EnrichmentStage, Layer, StageOutput};
use crate::taxonomy::classify;

/// Emits one [`CategorySale`] per therapeutic category, in category order.
pub struct CategoryBreakdownStage;

impl EnrichmentStage for CategoryBreakdownStage {
    fn apply(&self, record: &PeriodRecord, _prior: &[Layer]) -> Result<StageOutput> {
        tally_categories(record).map(StageOutput::CategoryBreakdown)
    }
}

/// Partition a record's products by [`classify`] and sum each category.
///
/// Fails when the category quantities do not add up to the record's
/// `total_quantity`.
pub fn tally_categories(record: &PeriodRecord) -> Result<Vec<CategorySale>> {
    let mut sales: Vec<CategorySale> = TherapeuticCategory::ALL
        .iter()
        .map(|&category| CategorySale {
            category,
            quantity: 0,
            product_count: 0,
        })
        .collect();

    for product in &record.products {
        let category = classify(&product.code, &product.designation);
        if let Some(sale) = sales.iter_mut().find(|s| s.category == category) {
            sale.quantity = sale
                .quantity
                .checked_add(product.quantity_sold)
                .ok_or_else(|| overflow(record))?;
            sale.product_count += 1;
        }
    }

    let sum = sales
        .iter()
        .try_fold(0u64, |acc, s| acc.checked_add(s.quantity))
        .ok_or_else(|| overflow(record))?;
    if sum != record.total_quantity {
        return Err(VracError::validation(format!(
            "{}: category quantities sum to {sum}, totalQuantity is {}",
            record.key(),
            record.total_quantity
        )));
    }
    Ok(sales)
}

fn overflow(record: &PeriodRecord) -> VracError {
    VracError::validation(format!("{}: category quantities overflow", record.key()))
}
