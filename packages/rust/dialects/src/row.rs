//! Comma-separated row splitting shared by both dialects.

/// Split one export line into trimmed cells.
///
/// Commas inside double-quoted fields do not split and `""` inside a quoted
/// field is a literal quote. A line that yields no record (empty input) is a
/// single empty cell.
pub fn split_row(line: &str) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) => record.iter().map(str::to_string).collect(),
        _ => vec![String::new()],
    }
}

/// Header-cell comparison: case-insensitive, surrounding whitespace ignored.
pub(crate) fn cell_is(cell: &str, expected: &str) -> bool {
    cell.trim().eq_ignore_ascii_case(expected)
}

/// Lowercased substring test on a header cell.
pub(crate) fn cell_contains(cell: &str, fragment: &str) -> bool {
    cell.to_lowercase().contains(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_cells_are_trimmed() {
        assert_eq!(split_row(" 1 , ABC ,  12 "), vec!["1", "ABC", "12"]);
    }

    #[test]
    fn quoted_commas_do_not_split() {
        assert_eq!(
            split_row(r#"3,X1,"SIROP TOUX, ADULTE","2,500""#),
            vec!["3", "X1", "SIROP TOUX, ADULTE", "2,500"]
        );
    }

    #[test]
    fn doubled_quotes_are_literal() {
        assert_eq!(
            split_row(r#"1,A1,"SIROP ""KIDS""",12"#),
            vec!["1", "A1", "SIROP \"KIDS\"", "12"]
        );
    }

    #[test]
    fn unterminated_quote_runs_to_end_of_line() {
        assert_eq!(split_row(r#"A1,"OPEN, QUOTE"#), vec!["A1", "OPEN, QUOTE"]);
    }

    #[test]
    fn empty_fields_are_kept() {
        assert_eq!(split_row("a,,c,"), vec!["a", "", "c", ""]);
        assert_eq!(split_row(""), vec![""]);
    }

    #[test]
    fn header_cell_helpers() {
        assert!(cell_is(" Code ", "code"));
        assert!(cell_contains("Désignation", "signation"));
        assert!(!cell_contains("Code", "signation"));
    }
}
