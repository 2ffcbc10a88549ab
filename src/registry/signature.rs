//! Signature-list line parsing.
//!
//! Input lines look like `"Cbm Cat. 1"$"Cod. bav. monac. Cat. 1"`:
//! double-quote-delimited cells separated by a single `$`, where a cell
//! boundary is a `$` with a quote character immediately before and after.
//! The first cell is the valid (primary) signature; later cells are
//! alternate signatures. Parsing stops at the first empty cell, so trailing
//! cells are not required to be well-formed.

use super::RegistryError;

/// Split a raw line into cells at every `$` that sits between two quotes.
fn split_cells(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut cells = Vec::new();
    let mut start = 0;
    for (index, &byte) in bytes.iter().enumerate() {
        if byte == b'$'
            && index > 0
            && bytes[index - 1] == b'"'
            && bytes.get(index + 1) == Some(&b'"')
        {
            cells.push(&line[start..index]);
            start = index + 1;
        }
    }
    cells.push(&line[start..]);
    cells
}

/// Strip embedded line breaks and a byte-order mark, then trim.
fn clean_cell(cell: &str) -> String {
    cell.chars()
        .filter(|c| !matches!(c, '\r' | '\n' | '\u{FEFF}'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// A cleaned cell must contain exactly two quote characters and must start
/// and end with one.
fn check_cell(cell: &str) -> Result<(), RegistryError> {
    let quotes = cell.chars().filter(|&c| c == '"').count();
    if quotes != 2 || !cell.starts_with('"') || !cell.ends_with('"') {
        return Err(RegistryError::MalformedSignatureLine {
            line: cell.to_string(),
        });
    }
    Ok(())
}

/// Parse one signature-list line into its ordered signature strings.
///
/// The primary signature (first cell) must be non-empty after unquoting.
/// An empty later cell ends parsing; everything collected so far is kept.
pub fn parse_signature_line(line: &str) -> Result<Vec<String>, RegistryError> {
    let mut signatures = Vec::new();

    for (index, raw_cell) in split_cells(line).into_iter().enumerate() {
        let cell = clean_cell(raw_cell);
        check_cell(&cell)?;

        // check_cell guarantees the quotes are the first and last chars
        let value = cell[1..cell.len() - 1].to_string();

        if index == 0 && value.is_empty() {
            return Err(RegistryError::EmptyPrimarySignature);
        }
        if value.is_empty() {
            break;
        }
        signatures.push(value);
    }

    Ok(signatures)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_valid_line() {
        let signatures = parse_signature_line(r#""A"$"B"$"C""#).unwrap();
        assert_eq!(signatures, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_single_cell_line() {
        let signatures = parse_signature_line(r#""Cbm Cat. 1""#).unwrap();
        assert_eq!(signatures, vec!["Cbm Cat. 1"]);
    }

    #[test]
    fn test_example_scenario_signatures() {
        let signatures =
            parse_signature_line(r#""Cbm Cat. 1"$"Cod. bav. monac. Cat. 1""#).unwrap();
        assert_eq!(signatures, vec!["Cbm Cat. 1", "Cod. bav. monac. Cat. 1"]);
    }

    #[test]
    fn test_dollar_inside_cell_is_not_a_boundary() {
        // No quote on both sides of the $, so the cell stays whole.
        let signatures = parse_signature_line(r#""Cod. 4$7""#).unwrap();
        assert_eq!(signatures, vec!["Cod. 4$7"]);
    }

    #[test]
    fn test_three_quotes_in_cell_is_malformed() {
        let error = parse_signature_line(r#""A""$"B""#).unwrap_err();
        match error {
            RegistryError::MalformedSignatureLine { line } => assert_eq!(line, r#""A"""#),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unquoted_cell_is_malformed() {
        assert!(matches!(
            parse_signature_line(r#""A"$B"#),
            Err(RegistryError::MalformedSignatureLine { .. })
        ));
    }

    #[test]
    fn test_empty_primary_signature() {
        assert!(matches!(
            parse_signature_line(r#"""$"B""#),
            Err(RegistryError::EmptyPrimarySignature)
        ));
    }

    #[test]
    fn test_stops_at_first_empty_cell() {
        let signatures = parse_signature_line(r#""A"$""$"C""#).unwrap();
        assert_eq!(signatures, vec!["A"]);
    }

    #[test]
    fn test_cleans_bom_and_line_breaks() {
        let signatures = parse_signature_line("\u{FEFF}\"A\"$\"B\"\r\n").unwrap();
        assert_eq!(signatures, vec!["A", "B"]);
    }

    #[test]
    fn test_malformed_error_names_cleaned_cell() {
        let error = parse_signature_line("\"A\"$\"B\r\n\"extra\"").unwrap_err();
        match error {
            RegistryError::MalformedSignatureLine { line } => {
                assert!(!line.contains('\r'));
                assert!(!line.contains('\n'));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
