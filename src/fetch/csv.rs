//! Parser for the spreadsheet CSV export.

use std::mem::take;

/// Split CSV text into rows of string cells.
///
/// Quoted fields may contain commas, newlines and doubled quotes. Both LF and
/// CRLF line endings are accepted. Blank lines inside the text are kept as
/// single-cell rows so that row positions match the sheet; trailing line
/// breaks at the very end are ignored.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let text = text.trim_end_matches(['\r', '\n']);
    let mut rows = Vec::new();
    if text.is_empty() {
        return rows;
    }

    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => row.push(take(&mut field)),
            '\r' | '\n' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(take(&mut field));
                rows.push(take(&mut row));
            }
            _ => field.push(ch),
        }
    }

    // Unterminated quotes still flush what was read.
    row.push(field);
    rows.push(row);
    rows
}
