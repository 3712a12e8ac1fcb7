// src/compute/filter.rs
//! KeepOnlyMatchingLines and ExcludeMatchingLines.

use anyhow::{bail, Result};
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

use super::psl::compile_psl;
use crate::table::SourceTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Keep,
    Exclude,
}

/// Row predicates on a single cell. Absent predicates take no part.
struct Predicates {
    regex: Option<Regex>,
    values: Option<HashSet<String>>,
}

impl Predicates {
    fn build(reg_exp: Option<&str>, value_list: Option<&str>) -> Result<Self> {
        let regex = match reg_exp {
            Some(psl) if !psl.is_empty() => Some(compile_psl(psl)?),
            _ => None,
        };
        let values = value_list.map(|list| {
            list.split(',')
                .filter(|v| !v.is_empty())
                .map(str::to_lowercase)
                .collect()
        });
        Ok(Self { regex, values })
    }

    fn is_empty(&self) -> bool {
        self.regex.is_none() && self.values.is_none()
    }

    /// Keep mode requires every predicate to match; exclude mode requires
    /// every predicate to miss.
    fn retains(&self, mode: Mode, cell: &str) -> bool {
        let expect = mode == Mode::Keep;
        let regex_ok = self
            .regex
            .as_ref()
            .map_or(true, |re| re.is_match(cell) == expect);
        let values_ok = self
            .values
            .as_ref()
            .map_or(true, |set| set.contains(&cell.to_lowercase()) == expect);
        regex_ok && values_ok
    }
}

pub fn apply(
    table: &mut SourceTable,
    mode: Mode,
    column: i64,
    reg_exp: Option<&str>,
    value_list: Option<&str>,
) -> Result<()> {
    if column < 1 {
        bail!("invalid column index {}", column);
    }
    let predicates = Predicates::build(reg_exp, value_list)?;
    if predicates.is_empty() {
        debug!("{:?} matching lines: no regExp nor valueList, table unchanged", mode);
        return Ok(());
    }

    let index = (column - 1) as usize;
    let before = table.table.len();
    // A row without the column is dropped in both modes
    table
        .table
        .retain(|row| row.get(index).is_some_and(|cell| predicates.retains(mode, cell)));
    debug!(
        "{:?} matching lines: {} of {} row(s) retained",
        mode,
        table.table.len(),
        before
    );
    Ok(())
}
