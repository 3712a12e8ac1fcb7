// src/compute/convert.rs
use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use super::directive::ConversionType;
use crate::table::SourceTable;

static HEX_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Fa-f]+$").expect("valid hex regex"));

pub const UNKNOWN_STATUS: &str = "UNKNOWN";

pub fn apply(table: &mut SourceTable, column: i64, conversion: ConversionType) -> Result<()> {
    if column < 1 {
        bail!("invalid column index {}", column);
    }
    let index = (column - 1) as usize;

    for row in table.table.iter_mut() {
        let Some(value) = row.get_mut(index) else {
            continue;
        };
        match conversion {
            ConversionType::Hex2Dec => match hex_to_decimal(value) {
                Some(decimal) => *value = decimal,
                None => warn!("convert: {:?} is not a hexadecimal value, left unchanged", value),
            },
            ConversionType::Array2SimpleStatus => *value = worst_status(value).to_string(),
        }
    }
    Ok(())
}

/// `ff: dd:11` → `16768273`. Colons, whitespace and a `0x` prefix are ignored.
fn hex_to_decimal(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .collect();
    if !HEX_DIGITS.is_match(&digits) {
        return None;
    }
    u64::from_str_radix(&digits, 16).ok().map(|v| v.to_string())
}

/// Reduce a `|` or newline separated list of statuses to the worst one.
fn worst_status(value: &str) -> &'static str {
    let mut worst = 0u8;
    for token in value.split(['|', '\n']).map(str::trim) {
        let rank = match token.to_lowercase().as_str() {
            "ok" => 1,
            "degraded" => 2,
            "failed" => 3,
            _ => 0,
        };
        worst = worst.max(rank);
    }
    match worst {
        3 => "failed",
        2 => "degraded",
        1 => "ok",
        _ => UNKNOWN_STATUS,
    }
}
