//! Rank-limited (`ETAT_2080QTE`, top-N) export parser.
//!
//! Layout: a free-text preamble, then a header such as
//! `Rang,Code,Désignation,Qté vendue`, then ranked rows until a blank line
//! or a `LISTE DES ...` section begins.

use tracing::trace;
use vrac_shared::{Dialect, ParseOptions, ProductSale, normalize_quantity};

use super::{DialectParser, RowScan};
use crate::row::{cell_contains, cell_is, split_row};

/// Line prefix that starts the next section of a rank-limited export.
const SECTION_TERMINATOR: &str = "LISTE DES";

/// Parser for the top-N ranked export.
pub struct RankLimitedParser;

/// Column positions resolved from the header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    rank: usize,
    code: usize,
    designation: usize,
    quantity: Option<usize>,
}

impl DialectParser for RankLimitedParser {
    fn dialect(&self) -> Dialect {
        Dialect::RankLimited
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
            if line.trim().is_empty() || line.trim_start().starts_with(SECTION_TERMINATOR) {
                break;
            }

            let parts = split_row(line);
            if parts.len() < 3 {
                scan.rows_malformed += 1;
                continue;
            }

            let Some(rank) = parts.get(columns.rank).and_then(|r| r.parse::<u32>().ok()) else {
                scan.rows_malformed += 1;
                continue;
            };

            let code = pick(&parts, columns.code, 1);
            let designation = pick(&parts, columns.designation, 2);
            let quantity = columns
                .quantity
                .and_then(|i| parts.get(i))
                .or_else(|| parts.last())
                .map(|q| normalize_quantity(q))
                .unwrap_or(0);

            if (1..=opts.rank_window).contains(&rank) && !code.is_empty() && quantity > 0 {
                scan.products
                    .push(ProductSale::new(code, designation, quantity as u64));
            } else {
                trace!(rank, code = %code, quantity, "row outside rank window or empty");
                scan.rows_rejected += 1;
            }
        }

        scan
    }

    fn name(&self) -> &str {
        "rank-limited"
    }
}

/// Header detection: a rank marker, a `Code` column and a designation column.
fn find_header(lines: &[&str], scan_lines: usize) -> Option<(usize, Columns)> {
    lines.iter().take(scan_lines).enumerate().find_map(|(idx, line)| {
        let cells = split_row(line);
        let rank = cells
            .iter()
            .position(|c| cell_is(c, "rang") || cell_is(c, "rank"))?;
        let code = cells.iter().position(|c| cell_is(c, "code"))?;
        let designation = cells.iter().position(|c| cell_contains(c, "signation"))?;
        let quantity = cells.iter().position(|c| {
            (cell_contains(c, "qt") && cell_contains(c, "vendu")) || cell_contains(c, "quantit")
        });

        Some((
            idx,
            Columns {
                rank,
                code,
                designation,
                quantity,
            },
        ))
    })
}

/// Cell at the header-resolved column, falling back to a fixed position
/// when the row is shorter than the header.
fn pick(parts: &[String], column: usize, fallback: usize) -> String {
    parts
        .get(column)
        .or_else(|| parts.get(fallback))
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> RowScan {
        let lines: Vec<&str> = text.lines().collect();
        RankLimitedParser.scan_rows(&lines, &ParseOptions::default())
    }

    #[test]
    fn reads_rows_until_terminator() {
        let scan = scan(
            "TANDA\n\
             Rang,Code,Désignation,Qté vendue\n\
             1,A1,COARTEM,\"1,200\"\n\
             2,B2,PARACETAMOL,300\n\
             LISTE DES AUTRES\n\
             3,C3,NOPE,10\n",
        );
        assert_eq!(scan.header_line, Some(1));
        assert_eq!(scan.products.len(), 2);
        assert_eq!(scan.products[0].quantity_sold, 1200);
        assert_eq!(scan.products[1].code, "B2");
    }

    #[test]
    fn filters_rank_window_and_zero_quantities() {
        let scan = scan(
            "Rang,Code,Désignation,Qté vendue\n\
             1,A1,ALPHA,10\n\
             20,A20,TWENTY,5\n\
             21,A21,TWENTY-ONE,50\n\
             0,A0,ZERO,5\n\
             4,A4,DASH,—\n",
        );
        let codes: Vec<&str> = scan.products.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["A1", "A20"]);
        assert_eq!(scan.rows_rejected, 3);
        assert_eq!(scan.rows_malformed, 0);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let scan = scan(
            "Rang,Code,Désignation,Qté vendue\n\
             x,A1,ALPHA,10\n\
             2,B2\n\
             3,C3,GAMMA,7\n",
        );
        assert_eq!(scan.products.len(), 1);
        assert_eq!(scan.products[0].code, "C3");
        assert_eq!(scan.rows_malformed, 2);
    }

    #[test]
    fn custom_rank_window() {
        let lines = [
            "Rank,Code,Designation,Quantity",
            "1,A,ALPHA,1",
            "2,B,BETA,1",
            "3,C,GAMMA,1",
        ];
        let opts = ParseOptions {
            rank_window: 2,
            ..ParseOptions::default()
        };
        let scan = RankLimitedParser.scan_rows(&lines, &opts);
        assert_eq!(scan.products.len(), 2);
    }

    #[test]
    fn missing_quantity_header_uses_last_column() {
        let scan = scan("Rang,Code,Désignation,Ventes\n1,A1,ALPHA,42\n");
        assert_eq!(scan.products[0].quantity_sold, 42);
    }

    #[test]
    fn header_outside_scan_window_is_not_found() {
        let mut text = "filler\n".repeat(50);
        text.push_str("Rang,Code,Désignation,Qté vendue\n1,A1,ALPHA,10\n");
        assert_eq!(scan(&text), RowScan::default());
    }
}
