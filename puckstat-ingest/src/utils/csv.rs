//! Minimal CSV reader (quotes and CRLF tolerant)

use std::collections::HashMap;
use std::mem::take;

/// Split CSV text into rows of fields
///
/// Blank lines are skipped. An unterminated quote runs to the end of the text.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
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
            '"' => in_quotes = true,
            ',' if !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(take(&mut field));
                flush_row(&mut rows, &mut row);
            }
            _ => field.push(ch),
        }
    }

    row.push(field);
    flush_row(&mut rows, &mut row);

    rows
}

fn flush_row(rows: &mut Vec<Vec<String>>, row: &mut Vec<String>) {
    if row.len() == 1 && row[0].trim().is_empty() {
        row.clear();
    } else {
        rows.push(take(row));
    }
}

/// Header row with column lookup by name
#[derive(Debug, Clone)]
pub struct Header {
    columns: HashMap<String, usize>,
    width: usize,
}

impl Header {
    pub fn new(names: &[String]) -> Self {
        let columns = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();
        Self {
            columns,
            width: names.len(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn index(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Trimmed, non-empty cell of `row` under column `name`
    pub fn get<'a>(&self, row: &'a [String], name: &str) -> Option<&'a str> {
        self.index(name)
            .and_then(|i| row.get(i))
            .map(|cell| cell.trim())
            .filter(|cell| !cell.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows_handles_quotes_and_crlf() {
        let rows = parse_rows("playerId,name\r\n8478402,\"McDavid, Connor\"\r\n8477934,\"Leon \"\"Leo\"\" Draisaitl\"\r\n");

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["8478402", "McDavid, Connor"]);
        assert_eq!(rows[2][1], "Leon \"Leo\" Draisaitl");
    }

    #[test]
    fn test_trailing_newline_and_blank_lines_are_skipped() {
        let rows = parse_rows("a,b\n\n1,2\n");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn test_empty_cells_are_kept() {
        let rows = parse_rows("a,b,c\n1,,3");
        assert_eq!(rows[1], vec!["1", "", "3"]);
    }

    #[test]
    fn test_header_lookup() {
        let rows = parse_rows("playerId, name ,situation\n1,A,all\n");
        let header = Header::new(&rows[0]);

        assert_eq!(header.width(), 3);
        assert_eq!(header.get(&rows[1], "name"), Some("A"));
        assert_eq!(header.get(&rows[1], "missing"), None);
    }
}
