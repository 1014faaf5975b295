//! Reporting-period extraction (`Période du DD/MM/YYYY au DD/MM/YYYY`).

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use vrac_shared::parse_export_date;

/// Matches `du DATE au DATE` (French exports) or `from DATE to DATE`.
static PERIOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:du|from)\s+(\d{2}/\d{2}/\d{4})\s+(?:au|to)\s+(\d{2}/\d{2}/\d{4})")
        .expect("period regex")
});

/// A reporting window found in an export preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractedPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ExtractedPeriod {
    /// Year of the period, taken from the end date.
    pub fn year(&self) -> i32 {
        self.end.year()
    }

    /// The exporter's default August 1 – December 10 window for `year`.
    pub fn default_window(year: i32) -> Option<Self> {
        Some(Self {
            start: NaiveDate::from_ymd_opt(year, 8, 1)?,
            end: NaiveDate::from_ymd_opt(year, 12, 10)?,
        })
    }
}

/// Find the first well-formed period statement in the scanned lines.
///
/// Statements with impossible calendar dates are ignored.
pub fn extract_period(lines: &[&str], scan_lines: usize) -> Option<ExtractedPeriod> {
    lines.iter().take(scan_lines).find_map(|line| {
        let caps = PERIOD_RE.captures(line)?;
        let start = parse_export_date(&caps[1])?;
        let end = parse_export_date(&caps[2])?;
        Some(ExtractedPeriod { start, end })
    })
}
