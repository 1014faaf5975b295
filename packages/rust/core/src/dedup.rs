//! Per-(pharmacy, year) deduplication of parsed period records.

use std::collections::HashMap;

use tracing::debug;

use vrac_shared::{PeriodKey, PeriodRecord};

/// Keep one record per `(pharmacy, year)`.
///
/// The candidate with strictly more products wins; on an exact tie the
/// first-seen candidate in input order is kept. Output is sorted by pharmacy
/// id ascending, then year descending.
pub fn deduplicate(records: Vec<PeriodRecord>) -> Vec<PeriodRecord> {
    let mut survivors: Vec<PeriodRecord> = Vec::with_capacity(records.len());
    let mut slots: HashMap<PeriodKey, usize> = HashMap::new();

    for record in records {
        let key = record.key();
        match slots.get(&key) {
            Some(&slot) => {
                let current = &survivors[slot];
                if record.products.len() > current.products.len() {
                    debug!(
                        %key,
                        kept = record.products.len(),
                        dropped = current.products.len(),
                        "candidate supersedes earlier record"
                    );
                    survivors[slot] = record;
                } else {
                    debug!(
                        %key,
                        kept = current.products.len(),
                        dropped = record.products.len(),
                        "candidate discarded by earlier record"
                    );
                }
            }
            None => {
                slots.insert(key, survivors.len());
                survivors.push(record);
            }
        }
    }

    survivors.sort_by(|a, b| {
        a.pharmacy_id
            .as_str()
            .cmp(b.pharmacy_id.as_str())
            .then(b.year.cmp(&a.year))
    });
    survivors
}
