//! Dialect parsers for pharmacy point-of-sale exports.
//!
//! This crate provides:
//! - [`parsers`]: the rank-limited and full-catalog table parsers
//! - [`DialectRegistry`]: one parser per [`Dialect`]
//! - [`parse`] / [`parse_with_outcome`]: total functions turning raw export
//!   text into a [`PeriodRecord`] (or nothing)
//!
//! Parsing never fails loudly: bad rows are skipped and counted, and a file
//! without a known pharmacy or without valid rows yields no record.

pub mod identity;
pub mod parsers;
pub mod period;
mod row;

use std::sync::LazyLock;

use tracing::{debug, instrument, warn};
use vrac_shared::{Dialect, MappingHints, ParseOptions, PeriodRecord};

pub use identity::{PharmacyMatch, detect_pharmacy};
pub use parsers::{DialectParser, DialectRegistry, FullCatalogParser, RankLimitedParser, RowScan};
pub use period::{ExtractedPeriod, extract_period};
pub use row::split_row;

static REGISTRY: LazyLock<DialectRegistry> = LazyLock::new(DialectRegistry::new);

/// Why a candidate file produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No known pharmacy token in the preamble.
    UnmappedPharmacy,
    /// The dialect's header row was not found.
    MissingHeader,
    /// Header found, but no row survived validation.
    NoValidRows,
    /// No period statement and no registry hint to fall back on.
    MissingPeriod,
    /// Row quantities add up to more than a `u64` can hold.
    QuantityOverflow,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnmappedPharmacy => "unmapped_pharmacy",
            Self::MissingHeader => "missing_header",
            Self::NoValidRows => "no_valid_rows",
            Self::MissingPeriod => "missing_period",
            Self::QuantityOverflow => "quantity_overflow",
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full result of parsing one file: the record (if any) plus row counters.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub record: Option<PeriodRecord>,
    pub rejection: Option<Rejection>,
    pub identity: PharmacyMatch,
    pub rows_malformed: usize,
    pub rows_rejected: usize,
}

impl ParseOutcome {
    fn rejected(rejection: Rejection, identity: PharmacyMatch, scan: &RowScan) -> Self {
        Self {
            record: None,
            rejection: Some(rejection),
            identity,
            rows_malformed: scan.rows_malformed,
            rows_rejected: scan.rows_rejected,
        }
    }
}

/// Parse `raw` as `dialect`. Returns `None` when the file yields no record.
pub fn parse(
    dialect: Dialect,
    raw: &str,
    hints: &MappingHints,
    opts: &ParseOptions,
) -> Option<PeriodRecord> {
    parse_with_outcome(dialect, raw, Some(hints), opts).record
}

/// Parse `raw` as `dialect`, reporting row counters and the rejection reason.
///
/// `hints` come from the source registry. Without hints the file must carry
/// its own period statement and the label is derived from its dates.
#[instrument(skip_all, fields(dialect = %dialect))]
pub fn parse_with_outcome(
    dialect: Dialect,
    raw: &str,
    hints: Option<&MappingHints>,
    opts: &ParseOptions,
) -> ParseOutcome {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let lines: Vec<&str> = raw.lines().collect();
    let parser = REGISTRY.get(dialect);

    let identity = detect_pharmacy(&lines, opts.identity_scan_lines);
    let Some(pharmacy_id) = identity.pharmacy_id() else {
        debug!(parser = parser.name(), "no known pharmacy in preamble");
        return ParseOutcome::rejected(Rejection::UnmappedPharmacy, identity, &RowScan::default());
    };

    let scan = parser.scan_rows(&lines, opts);
    let Some(header_line) = scan.header_line else {
        debug!(parser = parser.name(), "table header not found");
        return ParseOutcome::rejected(Rejection::MissingHeader, identity, &scan);
    };
    if scan.products.is_empty() {
        debug!(
            parser = parser.name(),
            malformed = scan.rows_malformed,
            rejected = scan.rows_rejected,
            "no valid product rows"
        );
        return ParseOutcome::rejected(Rejection::NoValidRows, identity, &scan);
    }
    if PeriodRecord::checked_total(&scan.products).is_none() {
        warn!(
            parser = parser.name(),
            products = scan.products.len(),
            "row quantities overflow the period total"
        );
        return ParseOutcome::rejected(Rejection::QuantityOverflow, identity, &scan);
    }

    let period = extract_period(&lines, header_line)
        .or_else(|| hints.and_then(|h| ExtractedPeriod::default_window(h.year)));
    let Some(period) = period else {
        return ParseOutcome::rejected(Rejection::MissingPeriod, identity, &scan);
    };

    if let Some(h) = hints {
        if h.pharmacy_id != pharmacy_id {
            warn!(
                expected = %h.pharmacy_id,
                found = %pharmacy_id,
                "file identity disagrees with registry mapping; using file identity"
            );
        }
        if h.year != period.year() {
            warn!(
                expected = h.year,
                found = period.year(),
                "file period disagrees with registry mapping; using file period"
            );
        }
    }

    let label = hints
        .map(|h| h.period_label.clone())
        .unwrap_or_else(|| period_label(&period));

    let RowScan {
        products,
        rows_malformed,
        rows_rejected,
        ..
    } = scan;

    ParseOutcome {
        record: Some(PeriodRecord::new(
            pharmacy_id,
            label,
            period.start,
            period.end,
            products,
        )),
        rejection: None,
        identity,
        rows_malformed,
        rows_rejected,
    }
}

/// `Aug–Dec 2025` style label from a period's dates.
pub fn period_label(period: &ExtractedPeriod) -> String {
    format!(
        "{}–{} {}",
        period.start.format("%b"),
        period.end.format("%b"),
        period.year()
    )
}
