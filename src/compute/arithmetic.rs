// src/compute/arithmetic.rs
//! Add, Subtract, Multiply, Divide and And.

use anyhow::{bail, Result};
use tracing::debug;

use crate::reference::{format_decimal, parse_number, single_column};
use crate::table::SourceTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    And,
}

/// Operand of an arithmetic directive: a `$N` reference read from the row
/// before mutation, or a literal number.
enum Operand {
    Column(usize),
    Literal(f64),
}

impl Operand {
    fn parse(value: &str) -> Result<Self> {
        if let Some(n) = single_column(value) {
            if n == 0 {
                bail!("column reference $0 in arithmetic value");
            }
            return Ok(Operand::Column(n - 1));
        }
        match parse_number(value) {
            Some(v) => Ok(Operand::Literal(v)),
            None => bail!("arithmetic value {:?} is neither a number nor a $N reference", value),
        }
    }

    fn resolve(&self, row: &[String]) -> Option<f64> {
        match self {
            Operand::Literal(v) => Some(*v),
            Operand::Column(i) => row.get(*i).and_then(|cell| parse_number(cell)),
        }
    }
}

pub fn apply(table: &mut SourceTable, op: Operation, column: i64, value: &str) -> Result<()> {
    if column < 1 {
        bail!("invalid column index {}", column);
    }
    let operand = Operand::parse(value)?;
    if let Operand::Literal(v) = operand {
        if op == Operation::Divide && v == 0.0 {
            bail!("division by zero");
        }
    }

    let index = (column - 1) as usize;
    let mut skipped = 0usize;
    for row in table.table.iter_mut() {
        let Some(current) = row.get(index).and_then(|cell| parse_number(cell)) else {
            skipped += 1;
            continue;
        };
        let Some(rhs) = operand.resolve(row) else {
            skipped += 1;
            continue;
        };
        let Some(result) = compute(op, current, rhs) else {
            skipped += 1;
            continue;
        };
        row[index] = result;
    }

    if skipped > 0 {
        debug!("arithmetic {:?}: {} row(s) left unchanged", op, skipped);
    }
    Ok(())
}

fn compute(op: Operation, lhs: f64, rhs: f64) -> Option<String> {
    let result = match op {
        Operation::Add => lhs + rhs,
        Operation::Subtract => lhs - rhs,
        Operation::Multiply => lhs * rhs,
        Operation::Divide => {
            if rhs == 0.0 {
                return None;
            }
            lhs / rhs
        }
        Operation::And => return Some(((lhs as i64) & (rhs as i64)).to_string()),
    };
    result.is_finite().then(|| format_decimal(result))
}
