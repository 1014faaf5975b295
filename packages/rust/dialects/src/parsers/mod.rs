//! Dialect parser trait and built-in parsers for the two export formats.
//!
//! A parser only knows how to find its table and turn rows into
//! [`ProductSale`]s. Identity and period detection are shared and live in
//! the crate root's [`parse_with_outcome`](crate::parse_with_outcome).

mod full_catalog;
mod rank_limited;

use vrac_shared::{Dialect, ParseOptions, ProductSale};

pub use full_catalog::FullCatalogParser;
pub use rank_limited::RankLimitedParser;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Result of scanning a file's product table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowScan {
    /// Zero-based line index of the detected header, if any.
    pub header_line: Option<usize>,
    /// Accepted rows, in file order.
    pub products: Vec<ProductSale>,
    /// Rows that could not be read (too few columns, non-numeric rank).
    pub rows_malformed: usize,
    /// Well-formed rows filtered out (empty code, quantity ≤ 0, rank outside window).
    pub rows_rejected: usize,
}

/// Trait for dialect-specific table extraction.
///
/// Implementations must be total: any input yields a `RowScan`.
pub trait DialectParser: Send + Sync {
    /// The dialect this parser reads.
    fn dialect(&self) -> Dialect;

    /// Locate the header and read product rows from `lines`.
    fn scan_rows(&self, lines: &[&str], opts: &ParseOptions) -> RowScan;

    /// Human-readable parser name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds one parser per dialect.
pub struct DialectRegistry {
    parsers: Vec<Box<dyn DialectParser>>,
}

impl DialectRegistry {
    /// Create a registry with both built-in parsers.
    pub fn new() -> Self {
        Self {
            parsers: vec![Box::new(RankLimitedParser), Box::new(FullCatalogParser)],
        }
    }

    /// The parser for `dialect`.
    pub fn get(&self, dialect: Dialect) -> &dyn DialectParser {
        self.parsers
            .iter()
            .find(|p| p.dialect() == dialect)
            .map(|p| p.as_ref())
            .unwrap_or_else(|| unreachable!("every dialect has a built-in parser"))
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::new()
    }
}
