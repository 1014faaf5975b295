//! Locale-aware numeric and date helpers for point-of-sale exports.
//!
//! The exports use French formatting: `2,561` and `2 561` both mean two
//! thousand five hundred sixty-one. Commas are never decimal points.

use chrono::NaiveDate;

/// Normalize a textual quantity field to an integer.
///
/// Whitespace (including non-breaking spaces) is stripped, commas are removed
/// as thousands separators and the remainder is parsed and rounded.
/// Returns 0 for empty, non-numeric, non-finite or out-of-range input.
pub fn normalize_quantity(raw: &str) -> i64 {
    match clean_number(raw) {
        Some(value) => value.round() as i64,
        None => 0,
    }
}

/// Parse an optional numeric column (stock, price).
///
/// Same cleaning rules as [`normalize_quantity`], but absence or malformed
/// input yields `None` instead of 0.
pub fn parse_optional_number(raw: &str) -> Option<f64> {
    clean_number(raw)
}

fn clean_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();

    if cleaned.is_empty() {
        return None;
    }
    // `f64::from_str` accepts "inf"/"nan"; exports never carry those.
    if !cleaned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
    {
        return None;
    }

    let value: f64 = cleaned.parse().ok()?;
    // i64::MAX is not exactly representable; stay strictly below 2^63.
    if !value.is_finite() || value.abs() >= 9.223_372_036_854_775e18 {
        return None;
    }
    Some(value)
}

/// Parse an export date (`DD/MM/YYYY`) into a calendar date.
pub fn parse_export_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_separators() {
        assert_eq!(normalize_quantity("2,561"), 2561);
        assert_eq!(normalize_quantity("2 561"), 2561);
        assert_eq!(normalize_quantity("2\u{a0}561"), 2561);
        assert_eq!(normalize_quantity("1,234,567"), 1_234_567);
    }

    #[test]
    fn malformed_input_is_zero() {
        assert_eq!(normalize_quantity(""), 0);
        assert_eq!(normalize_quantity("   "), 0);
        assert_eq!(normalize_quantity("—"), 0);
        assert_eq!(normalize_quantity("abc"), 0);
        assert_eq!(normalize_quantity("inf"), 0);
        assert_eq!(normalize_quantity("NaN"), 0);
        assert_eq!(normalize_quantity("1e400"), 0);
        assert_eq!(normalize_quantity("99999999999999999999999"), 0);
    }

    #[test]
    fn rounds_fractions() {
        assert_eq!(normalize_quantity("12.4"), 12);
        assert_eq!(normalize_quantity("12.5"), 13);
        assert_eq!(normalize_quantity("-3"), -3);
    }

    #[test]
    fn optional_numbers() {
        assert_eq!(parse_optional_number("1,500"), Some(1500.0));
        assert_eq!(parse_optional_number("2 350.5"), Some(2350.5));
        assert_eq!(parse_optional_number(""), None);
        assert_eq!(parse_optional_number("n/a"), None);
    }

    #[test]
    fn export_dates() {
        assert_eq!(
            parse_export_date("01/08/2025"),
            NaiveDate::from_ymd_opt(2025, 8, 1)
        );
        assert_eq!(
            parse_export_date(" 10/12/2025 "),
            NaiveDate::from_ymd_opt(2025, 12, 10)
        );
        assert_eq!(parse_export_date("31/02/2025"), None);
        assert_eq!(parse_export_date("2025-08-01"), None);
    }
}
