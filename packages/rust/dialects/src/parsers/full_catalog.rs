//! Full-catalog (`ETAT_ListeProduitsVendus`) export parser.
//!
//! The table header has the fixed signature `Code,Désignation,Qté vendue`
//! followed by at least a `Stock` column (and usually `Prix`). Every product
//! sold in the period is listed; there is no rank column.

use tracing::trace;
use vrac_shared::{Dialect, ParseOptions, ProductSale, normalize_quantity, parse_optional_number};

use super::{DialectParser, RowScan};
use crate::row::{cell_contains, cell_is, split_row};

/// Footer line prefixes that end the product table (`Code Géo :`, `Nombre de produits`).
/// Kept accent-free so exports decoded with replacement characters still match.
const TRAILING_MARKERS: &[&str] = &["Code G", "Nombre d"];

/// Parser for the full product-catalog export.
pub struct FullCatalogParser;

/// Optional column positions resolved from the header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    stock: Option<usize>,
    price: Option<usize>,
}

impl DialectParser for FullCatalogParser {
    fn dialect(&self) -> Dialect {
        Dialect::FullCatalog
    }

    fn scan_rows(&self, lines: &[&str], opts: &ParseOptions) -> RowScan {
        let Some((header_idx, columns)) = find_header(lines, opts.header_scan_lines) else {
            return RowScan::default();
        };

        let mut scan = RowScan {
            header_line: Some(header_idx),
            ..RowScan::default()
        };

        for line in &lines[header_idx + 1..] {
            let trimmed = line.trim();
            if trimmed.is_empty() || TRAILING_MARKERS.iter().any(|m| trimmed.starts_with(m)) {
                break;
            }

            let parts = split_row(line);
            if parts.len() < 3 {
                scan.rows_malformed += 1;
                continue;
            }

            let code = &parts[0];
            let quantity = normalize_quantity(&parts[2]);
            if code.is_empty() || quantity <= 0 {
                trace!(code = %code, quantity, "row without code or sales");
                scan.rows_rejected += 1;
                continue;
            }

            scan.products.push(ProductSale {
                code: code.clone(),
                designation: parts[1].clone(),
                quantity_sold: quantity as u64,
                stock: optional(&parts, columns.stock),
                price: optional(&parts, columns.price),
            });
        }

        scan
    }

    fn name(&self) -> &str {
        "full-catalog"
    }
}

/// Header detection: the fixed leading signature plus a `Stock` column.
fn find_header(lines: &[&str], scan_lines: usize) -> Option<(usize, Columns)> {
    lines.iter().take(scan_lines).enumerate().find_map(|(idx, line)| {
        let cells = split_row(line);
        if cells.len() < 4 {
            return None;
        }

        let signature = cell_is(&cells[0], "code")
            && cell_contains(&cells[1], "signation")
            && ((cell_contains(&cells[2], "qt") && cell_contains(&cells[2], "vendu"))
                || cell_contains(&cells[2], "quantit"));
        let stock = cells.iter().position(|c| cell_contains(c, "stock"));
        if !signature || stock.is_none() {
            return None;
        }

        let price = cells
            .iter()
            .position(|c| cell_contains(c, "prix") || cell_contains(c, "price"));
        Some((idx, Columns { stock, price }))
    })
}

fn optional(parts: &[String], column: Option<usize>) -> Option<f64> {
    column
        .and_then(|i| parts.get(i))
        .and_then(|v| parse_optional_number(v))
}
