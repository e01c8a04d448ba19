//! Line splitting for delimited uploads.
//!
//! Deliberately smaller than RFC 4180: a field may be wrapped in one pair of
//! quote characters so it can contain the delimiter, and that is the only
//! quoting there is. No escaped quotes, no multi-line fields.

use crate::domain::{Dialect, RawRow, RowError, RowReason};

/// Turn one physical line into a `RawRow`.
///
/// - blank lines yield `Ok(None)` and are skipped by the caller
/// - a cell count different from the header width is a `malformed-row`
pub fn parse_row(
    line: &str,
    line_number: usize,
    dialect: Dialect,
    expected_cells: usize,
) -> Result<Option<RawRow>, RowError> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let cells = split_line(line, dialect);
    if cells.len() != expected_cells {
        return Err(RowError::new(line_number, RowReason::MalformedRow));
    }

    Ok(Some(RawRow {
        line: line_number,
        cells,
    }))
}

/// Split a line into cells. Unquoted cells are trimmed.
pub fn split_line(line: &str, dialect: Dialect) -> Vec<String> {
    let mut cells = Vec::new();
    let mut rest = line;
    loop {
        let (cell, tail) = next_cell(rest, dialect);
        cells.push(cell);
        match tail {
            Some(tail) => rest = tail,
            None => break,
        }
    }
    cells
}

fn next_cell(input: &str, dialect: Dialect) -> (String, Option<&str>) {
    // Padding must never swallow the delimiter itself (tab-separated files).
    let is_pad = |c: char| c.is_whitespace() && c != dialect.delimiter;

    let leading = input.trim_start_matches(is_pad);
    if let Some(body) = leading.strip_prefix(dialect.quote) {
        if let Some(close) = body.find(dialect.quote) {
            let inner = &body[..close];
            let after = body[close + dialect.quote.len_utf8()..].trim_start_matches(is_pad);
            if after.is_empty() {
                return (inner.to_string(), None);
            }
            if let Some(tail) = after.strip_prefix(dialect.delimiter) {
                return (inner.to_string(), Some(tail));
            }
        }
        // Quote does not wrap the whole field: fall through and read it literally.
    }

    match input.find(dialect.delimiter) {
        Some(idx) => (
            input[..idx].trim().to_string(),
            Some(&input[idx + dialect.delimiter.len_utf8()..]),
        ),
        None => (input.trim().to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comma() -> Dialect {
        Dialect::default()
    }

    #[test]
    fn splits_and_trims_plain_cells() {
        assert_eq!(split_line(" 2024-01-01 , 100,5 ", comma()), vec!["2024-01-01", "100", "5"]);
        assert_eq!(split_line("a,,b,", comma()), vec!["a", "", "b", ""]);
    }

    #[test]
    fn quoted_field_keeps_delimiter() {
        assert_eq!(
            split_line(r#""Jan 1, 2024",100,5"#, comma()),
            vec!["Jan 1, 2024", "100", "5"]
        );
        assert_eq!(split_line(r#"x, "a,b" ,y"#, comma()), vec!["x", "a,b", "y"]);
    }

    #[test]
    fn partial_quotes_are_literal() {
        // Closing quote followed by more text: not a wrapped field.
        assert_eq!(split_line(r#""a"b,c"#, comma()), vec![r#""a"b"#, "c"]);
        // Unterminated quote.
        assert_eq!(split_line(r#""abc,d"#, comma()), vec![r#""abc"#, "d"]);
        // Quote in the middle of a field.
        assert_eq!(split_line(r#"ab"c,d"#, comma()), vec![r#"ab"c"#, "d"]);
    }

    #[test]
    fn tab_dialect_keeps_empty_cells() {
        let tsv = Dialect {
            delimiter: '\t',
            quote: '"',
        };
        assert_eq!(split_line("2024-01-01\t\t7", tsv), vec!["2024-01-01", "", "7"]);
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(parse_row("   ", 3, comma(), 3), Ok(None));
        assert_eq!(parse_row("", 3, comma(), 3), Ok(None));
    }

    #[test]
    fn cell_count_mismatch_is_malformed() {
        let err = parse_row("2024-01-01,100", 7, comma(), 3).unwrap_err();
        assert_eq!(err, RowError::new(7, RowReason::MalformedRow));

        let row = parse_row("2024-01-01,100,5", 8, comma(), 3).unwrap().unwrap();
        assert_eq!(row.line, 8);
        assert_eq!(row.cells.len(), 3);
    }
}
