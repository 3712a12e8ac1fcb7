// src/table/mod.rs
use serde::{Deserialize, Serialize};

/// Separator used for the canonical text form of a table.
pub const TABLE_SEP: &str = ";";

/// The rows a source produced, plus the raw text they were derived from (or
/// serialized to). Rows are ragged: each one is sized independently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceTable {
    /// Each row, as a Vec of Strings (one per cell).
    #[serde(default)]
    pub table: Vec<Vec<String>>,
    /// CSV, JSON, XML or interpreter output backing the rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<String>,
}

impl SourceTable {
    pub fn new(table: Vec<Vec<String>>) -> Self {
        Self {
            table,
            raw_data: None,
        }
    }

    /// A table carrying only a raw serialization (JSON, XML, command output).
    pub fn from_raw(raw_data: impl Into<String>) -> Self {
        Self {
            table: Vec::new(),
            raw_data: Some(raw_data.into()),
        }
    }

    /// Regenerate `raw_data` from the rows, using the canonical `;` form.
    pub fn refresh_raw_data(&mut self) {
        self.raw_data = Some(table_to_csv(&self.table, TABLE_SEP));
    }

    /// Drop every row and the raw text.
    pub fn clear(&mut self) {
        self.table.clear();
        self.raw_data = None;
    }

    /// The raw text when present and non-empty, otherwise the rows serialized with `;`.
    pub fn text_or_serialized(&self) -> String {
        match self.raw_data.as_deref() {
            Some(raw) if !raw.is_empty() => raw.to_string(),
            _ => table_to_csv(&self.table, TABLE_SEP),
        }
    }
}

/// Render rows as lines where every cell is followed by `separator`,
/// e.g. `ID1;NAME1;`. Lines are joined with `\n`.
pub fn table_to_csv(rows: &[Vec<String>], separator: &str) -> String {
    rows.iter()
        .map(|row| {
            let mut line = String::new();
            for cell in row {
                line.push_str(cell);
                line.push_str(separator);
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse text produced by [`table_to_csv`] (or any separator-delimited text)
/// back into rows. Blank lines are skipped; one trailing empty cell left by a
/// terminating separator is dropped.
pub fn csv_to_table(text: &str, separator: &str) -> Vec<Vec<String>> {
    if separator.is_empty() {
        return line_to_list(text, "\n")
            .into_iter()
            .map(|line| vec![line])
            .collect();
    }

    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut cells: Vec<String> = line.split(separator).map(str::to_string).collect();
            if line.ends_with(separator) {
                cells.pop();
            }
            cells
        })
        .collect()
}

/// Split `text` on `separator`, trimming each element and dropping empties.
pub fn line_to_list(text: &str, separator: &str) -> Vec<String> {
    text.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split `cell` on `;` and splice the pieces into `row` at `index`, replacing
/// the cell. Used wherever a computed value may carry extra columns.
pub fn splice_cell(row: &mut Vec<String>, index: usize, cell: String) {
    if !cell.contains(TABLE_SEP) {
        if index < row.len() {
            row[index] = cell;
        } else {
            row.push(cell);
        }
        return;
    }

    let pieces: Vec<String> = cell.split(TABLE_SEP).map(str::to_string).collect();
    if index < row.len() {
        row.splice(index..=index, pieces);
    } else {
        row.extend(pieces);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::rows;

    #[test]
    fn serializes_every_cell_with_trailing_separator() {
        let table = rows(&[&["ID1", "NAME1"], &["ID2", "NAME2"]]);
        assert_eq!(table_to_csv(&table, ";"), "ID1;NAME1;\nID2;NAME2;");
    }

    #[test]
    fn parses_back_canonical_text() {
        let parsed = csv_to_table("ID1;NAME1;\n\nID2;;\r\n", ";");
        assert_eq!(parsed, rows(&[&["ID1", "NAME1"], &["ID2", ""]]));
    }

    #[test]
    fn line_to_list_trims_and_skips_empties() {
        assert_eq!(line_to_list(" id ; name;;", ";"), vec!["id", "name"]);
    }

    #[test]
    fn splice_cell_inserts_extra_columns_in_place() {
        let mut row = vec!["a".to_string(), "b;c".to_string(), "d".to_string()];
        let cell = row[1].clone();
        splice_cell(&mut row, 1, cell);
        assert_eq!(row, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn text_or_serialized_prefers_raw_data() {
        let mut t = SourceTable::new(rows(&[&["x"]]));
        assert_eq!(t.text_or_serialized(), "x;");
        t.raw_data = Some("raw".into());
        assert_eq!(t.text_or_serialized(), "raw");
    }
}
