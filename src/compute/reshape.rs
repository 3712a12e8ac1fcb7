// src/compute/reshape.rs
//! String-reshaping directives: cells are concatenated, cut, split or
//! rearranged. A `;` in a computed value spills into extra columns.

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::reference::{cell, parse_position, single_column, ValueExpression};
use crate::table::{splice_cell, SourceTable, TABLE_SEP};

fn column_index(column: i64) -> Result<usize> {
    if column < 1 {
        bail!("invalid column index {}", column);
    }
    Ok((column - 1) as usize)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Before,
    After,
}

pub fn prepend(table: &mut SourceTable, column: i64, value: Option<&str>) -> Result<()> {
    concatenate(table, column, value, Side::Before)
}

pub fn append(table: &mut SourceTable, column: i64, value: Option<&str>) -> Result<()> {
    concatenate(table, column, value, Side::After)
}

/// Joins the resolved value onto the cell, then splices the `;` segments in
/// place: `prefix_` + `MANUFACTURER1` with value `new,Column;prefix_` gives
/// the two cells `new,Column` and `prefix_MANUFACTURER1`.
fn concatenate(table: &mut SourceTable, column: i64, value: Option<&str>, side: Side) -> Result<()> {
    let index = column_index(column)?;
    let value = value.context("no value to concatenate")?;
    let expr = ValueExpression::parse(value);

    for row in table.table.iter_mut() {
        let Some(resolved) = expr.resolve(row) else {
            continue;
        };
        // One past the end addresses a brand new column
        if resolved.is_empty() || index > row.len() {
            continue;
        }
        let current = row.get(index).map(String::as_str).unwrap_or("");
        let joined = match side {
            Side::Before => format!("{}{}", resolved, current),
            Side::After => format!("{}{}", current, resolved),
        };
        splice_cell(row, index, joined);
    }
    Ok(())
}

pub fn replace(
    table: &mut SourceTable,
    column: i64,
    existing_value: Option<&str>,
    new_value: Option<&str>,
) -> Result<()> {
    let index = column_index(column)?;
    let existing = ValueExpression::parse(existing_value.context("no existing value")?);
    let replacement = ValueExpression::parse(new_value.context("no new value")?);

    for row in table.table.iter_mut() {
        if index >= row.len() {
            continue;
        }
        let (Some(from), Some(to)) = (existing.resolve(row), replacement.resolve(row)) else {
            continue;
        };
        if from.is_empty() {
            continue;
        }
        let replaced = row[index].replace(&from, &to);
        if to.contains(TABLE_SEP) {
            splice_cell(row, index, replaced);
        } else {
            row[index] = replaced;
        }
    }
    Ok(())
}

/// A substring bound: literal position or a `$N` whose cell holds one.
enum Bound {
    Literal(usize),
    Column(usize),
}

impl Bound {
    fn parse(text: &str, what: &str) -> Result<Self> {
        if let Some(n) = single_column(text) {
            return Ok(Bound::Column(n));
        }
        parse_position(text)
            .map(Bound::Literal)
            .with_context(|| format!("substring {} {:?} is not numeric", what, text))
    }

    fn resolve(&self, row: &[String]) -> Option<usize> {
        match self {
            Bound::Literal(v) => Some(*v),
            Bound::Column(n) => cell(row, *n).and_then(parse_position),
        }
    }
}

pub fn substring(table: &mut SourceTable, column: i64, start: &str, length: &str) -> Result<()> {
    let index = column_index(column)?;
    let start = Bound::parse(start, "start")?;
    let length = Bound::parse(length, "length")?;

    for row in table.table.iter_mut() {
        if index >= row.len() {
            continue;
        }
        let (Some(start), Some(length)) = (start.resolve(row), length.resolve(row)) else {
            continue;
        };
        let chars: Vec<char> = row[index].chars().collect();
        if start < 1 || start > chars.len() || length > chars.len() - (start - 1) {
            debug!(
                "substring: range {}+{} outside {:?}, row unchanged",
                start, length, row[index]
            );
            continue;
        }
        row[index] = chars[start - 1..start - 1 + length].iter().collect();
    }
    Ok(())
}

/// Every character of `sub_separators` is its own delimiter.
pub fn extract(
    table: &mut SourceTable,
    column: i64,
    sub_column: i64,
    sub_separators: Option<&str>,
) -> Result<()> {
    let index = column_index(column)?;
    if sub_column < 1 {
        bail!("invalid sub-column index {}", sub_column);
    }
    let delimiters: Vec<char> = match sub_separators {
        Some(s) if !s.is_empty() => s.chars().collect(),
        _ => bail!("no sub-separators"),
    };
    let nth = (sub_column - 1) as usize;

    for row in table.table.iter_mut() {
        if let Some(text) = row.get_mut(index) {
            *text = text
                .lines()
                .filter_map(|line| line.split(|c| delimiters.contains(&c)).nth(nth))
                .collect::<Vec<_>>()
                .join(" ");
        }
    }
    Ok(())
}

pub fn duplicate_column(table: &mut SourceTable, column: i64, insert_at: Option<i64>) -> Result<()> {
    let source = column_index(column)?;
    let insert_at = match insert_at {
        Some(i) if i < 0 => bail!("negative insertion index {}", i),
        Some(i) => i as usize,
        None => source + 1,
    };

    for row in table.table.iter_mut() {
        let Some(value) = row.get(source).cloned() else {
            continue;
        };
        let at = insert_at.min(row.len());
        row.insert(at, value);
    }
    Ok(())
}

pub fn keep_columns(table: &mut SourceTable, column_numbers: &str) -> Result<()> {
    let indices = column_numbers
        .split(',')
        .map(|n| {
            let n = n.trim();
            match n.parse::<i64>() {
                Ok(v) if v >= 1 => Ok((v - 1) as usize),
                _ => bail!("invalid column number {:?}", n),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    if let Some(&max) = indices.iter().max() {
        if let Some(short) = table.table.iter().position(|row| max >= row.len()) {
            bail!("column {} is beyond the width of row {}", max + 1, short + 1);
        }
    }

    for row in table.table.iter_mut() {
        let kept: Vec<String> = indices.iter().map(|&i| row[i].clone()).collect();
        *row = kept;
    }
    Ok(())
}

pub fn extract_property_from_wbem_path(
    table: &mut SourceTable,
    column: i64,
    property: &str,
) -> Result<()> {
    let index = column_index(column)?;
    let property = property.trim();
    if property.is_empty() {
        bail!("no property name");
    }
    let suffix = format!(".{}", property.to_lowercase());

    for row in table.table.iter_mut() {
        if let Some(path) = row.get_mut(index) {
            if let Some(value) = wbem_property(path, &suffix) {
                *path = value;
            }
        }
    }
    Ok(())
}

/// Value of the first `Key=Value` pair whose (dotted) key ends with `suffix`.
fn wbem_property(path: &str, suffix: &str) -> Option<String> {
    path.split(',').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        let key = format!(".{}", key.trim().to_lowercase());
        key.ends_with(suffix).then(|| clean_str(value))
    })
}

/// Trim whitespace + strip quotes.
fn clean_str(raw: &str) -> String {
    raw.replace('"', "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::rows;

    fn disks() -> SourceTable {
        SourceTable::new(rows(&[
            &["ID1", "NAME1", "MANUFACTURER1", "DISKS1"],
            &["ID2", "NAME2", "MANUFACTURER2", "DISKS2"],
        ]))
    }

    #[test]
    fn prepend_spills_segments_into_new_columns() -> Result<()> {
        let mut t = disks();
        prepend(&mut t, 3, Some("new,Column;prefix_"))?;
        assert_eq!(
            t.table[0],
            vec!["ID1", "NAME1", "new,Column", "prefix_MANUFACTURER1", "DISKS1"]
        );

        let mut t = disks();
        prepend(&mut t, 1, Some("new,$4;AnotherNew.Column;prefix_"))?;
        assert_eq!(
            t.table[1],
            vec![
                "new,DISKS2",
                "AnotherNew.Column",
                "prefix_ID2",
                "NAME2",
                "MANUFACTURER2",
                "DISKS2"
            ]
        );
        Ok(())
    }

    #[test]
    fn append_and_new_column() -> Result<()> {
        let mut t = disks();
        append(&mut t, 3, Some("_suffix;new,Column"))?;
        assert_eq!(
            t.table[0],
            vec!["ID1", "NAME1", "MANUFACTURER1_suffix", "new,Column", "DISKS1"]
        );

        let mut t = disks();
        append(&mut t, 5, Some("$1"))?;
        assert_eq!(t.table[0][4], "ID1");

        let mut t = SourceTable::new(vec![vec![]]);
        prepend(&mut t, 1, Some("FOO"))?;
        assert_eq!(t.table, rows(&[&["FOO"]]));
        Ok(())
    }

    #[test]
    fn concatenate_rejects_bad_input() -> Result<()> {
        let mut t = disks();
        assert!(prepend(&mut t, 0, Some("x")).is_err());
        assert!(append(&mut t, 1, None).is_err());
        append(&mut t, 1, Some("$9"))?;
        append(&mut t, 1, Some(""))?;
        assert_eq!(t, disks());
        Ok(())
    }

    #[test]
    fn replace_literal_and_references() -> Result<()> {
        let mut t = SourceTable::new(rows(&[&["ID1", "fvalv1f"]]));
        replace(&mut t, 2, Some("lv"), Some("val1;val2"))?;
        assert_eq!(t.table[0], vec!["ID1", "fvaval1", "val21f"]);

        let mut t = SourceTable::new(rows(&[&["ID1", "v1v2", "v1"]]));
        replace(&mut t, 2, Some("$3"), Some("$1"))?;
        assert_eq!(t.table[0][1], "ID1v2");

        assert!(replace(&mut t, 2, None, Some("x")).is_err());
        Ok(())
    }

    #[test]
    fn substring_literal_and_reference() -> Result<()> {
        let mut t = SourceTable::new(rows(&[&["Dell+1", "x", "4"], &["HP", "y", "4"]]));
        substring(&mut t, 1, "1", "$3")?;
        assert_eq!(t.table[0][0], "Dell");
        assert_eq!(t.table[1][0], "HP");

        let mut t = SourceTable::new(rows(&[&["PowerEdge"]]));
        substring(&mut t, 1, "6", "4")?;
        assert_eq!(t.table[0][0], "Edge");

        assert!(substring(&mut t, 1, "a", "2").is_err());
        Ok(())
    }

    #[test]
    fn substring_huge_length_is_noop() -> Result<()> {
        let mut t = SourceTable::new(rows(&[&["PowerEdge", "18446744073709551615"]]));
        substring(&mut t, 1, "2", "18446744073709551615")?;
        assert_eq!(t.table[0][0], "PowerEdge");

        substring(&mut t, 1, "2", "$2")?;
        assert_eq!(t.table[0][0], "PowerEdge");

        substring(&mut t, 1, "18446744073709551615", "1")?;
        assert_eq!(t.table[0][0], "PowerEdge");
        Ok(())
    }

    #[test]
    fn extract_uses_each_separator_character() -> Result<()> {
        let mut t = SourceTable::new(rows(&[
            &["STATUS1 (1)"],
            &["1% of maximum"],
            &["|OK|1"],
        ]));
        let mut first = t.clone();
        extract(&mut t, 1, 2, Some("()"))?;
        assert_eq!(t.table[0][0], "1");

        extract(&mut first, 1, 1, Some("%%"))?;
        assert_eq!(first.table[1][0], "1");

        let mut pipes = SourceTable::new(rows(&[&["|OK|1"]]));
        extract(&mut pipes, 1, 4, Some("|"))?;
        assert_eq!(pipes.table[0][0], "");

        assert!(extract(&mut pipes, 1, 1, Some("")).is_err());
        Ok(())
    }

    #[test]
    fn duplicate_column_positions() -> Result<()> {
        let mut t = SourceTable::new(rows(&[&["a", "b"]]));
        duplicate_column(&mut t, 1, None)?;
        assert_eq!(t.table[0], vec!["a", "a", "b"]);
        duplicate_column(&mut t, 3, Some(10))?;
        assert_eq!(t.table[0], vec!["a", "a", "b", "b"]);
        assert!(duplicate_column(&mut t, 1, Some(-1)).is_err());
        Ok(())
    }

    #[test]
    fn keep_columns_permutation_round_trips() -> Result<()> {
        let original = disks();
        let mut t = original.clone();
        keep_columns(&mut t, "3, 1,4,2")?;
        assert_eq!(t.table[0], vec!["MANUFACTURER1", "ID1", "DISKS1", "NAME1"]);
        keep_columns(&mut t, "2,4,1,3")?;
        assert_eq!(t, original);

        let mut t = disks();
        keep_columns(&mut t, "1,1")?;
        assert_eq!(t.table[0], vec!["ID1", "ID1"]);

        let mut t = disks();
        assert!(keep_columns(&mut t, "1,5").is_err());
        assert!(keep_columns(&mut t, "0").is_err());
        assert_eq!(t, disks());
        Ok(())
    }

    #[test]
    fn wbem_path_property() -> Result<()> {
        let mut t = SourceTable::new(rows(&[
            &[r#"root/cimv2:CIM_Fan.CreationClassName="CIM_Fan",DeviceID="FAN 1""#],
            &["no pairs here"],
        ]));
        extract_property_from_wbem_path(&mut t, 1, "deviceid")?;
        assert_eq!(t.table[0][0], "FAN 1");
        assert_eq!(t.table[1][0], "no pairs here");
        Ok(())
    }
}
