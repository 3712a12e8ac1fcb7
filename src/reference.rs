// src/reference.rs
//! `$N` column references inside directive values.
//!
//! A value such as `new,$4;prefix_` is parsed once into literal and column
//! segments, then resolved against each row. `$N` is 1-based; a doubled
//! `$$N` is an escape and stays literal text.

use once_cell::sync::Lazy;
use regex::Regex;

static SINGLE_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\$(\d+)\s*$").expect("valid single column regex"));

static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid decimal regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// 1-based column index as written (may be 0, which never resolves).
    Column(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueExpression {
    segments: Vec<Segment>,
}

impl ValueExpression {
    pub fn parse(text: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c != '$' {
                literal.push(c);
                i += 1;
                continue;
            }

            // `$$N` escape: copy the whole run verbatim
            if i + 1 < chars.len() && chars[i + 1] == '$' {
                let mut j = i;
                while j < chars.len() && chars[j] == '$' {
                    literal.push('$');
                    j += 1;
                }
                while j < chars.len() && chars[j].is_ascii_digit() {
                    literal.push(chars[j]);
                    j += 1;
                }
                i = j;
                continue;
            }

            let mut j = i + 1;
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            if j == i + 1 {
                literal.push('$');
                i += 1;
                continue;
            }

            let digits: String = chars[i + 1..j].iter().collect();
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            // Out-of-range indexes collapse to 0 so they never resolve
            segments.push(Segment::Column(digits.parse().unwrap_or(0)));
            i = j;
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Self { segments }
    }

    /// Substitute every column reference with the row's cell. `None` when a
    /// reference is `$0` or points past the end of the row.
    pub fn resolve(&self, row: &[String]) -> Option<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Column(n) => out.push_str(cell(row, *n)?),
            }
        }
        Some(out)
    }
}

/// Cell at 1-based index `n`.
pub fn cell(row: &[String], n: usize) -> Option<&str> {
    if n == 0 {
        return None;
    }
    row.get(n - 1).map(String::as_str)
}

/// `Some(N)` when the whole value is a bare `$N` reference.
pub fn single_column(text: &str) -> Option<usize> {
    SINGLE_COLUMN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse a numeric operand the way arithmetic directives accept them.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Unsigned integer position, accepting a decimal part which is truncated.
pub fn parse_position(text: &str) -> Option<usize> {
    let trimmed = text.trim();
    if !DECIMAL.is_match(trimmed) {
        return None;
    }
    let whole = trimmed.split('.').next().unwrap_or(trimmed);
    whole.parse().ok()
}

/// Decimal rendering used by arithmetic results: always carries a fractional
/// part (`502` renders as `502.0`).
pub fn format_decimal(value: f64) -> String {
    let text = format!("{}", value);
    if value.is_finite() && !text.contains('.') && !text.contains('e') {
        format!("{}.0", text)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_mixed_literal_and_columns() {
        let expr = ValueExpression::parse("new,$4;prefix_$2");
        let r = row(&["ID1", "NAME1", "MANUFACTURER1", "DISKS1"]);
        assert_eq!(expr.resolve(&r).as_deref(), Some("new,DISKS1;prefix_NAME1"));
    }

    #[test]
    fn doubled_dollar_stays_literal() {
        let expr = ValueExpression::parse("prefix_$$1_middle_$2_suffix");
        let r = row(&["ID1", "NAME1"]);
        assert_eq!(
            expr.resolve(&r).as_deref(),
            Some("prefix_$$1_middle_NAME1_suffix")
        );
    }

    #[test]
    fn zero_and_out_of_range_do_not_resolve() {
        let r = row(&["a"]);
        assert_eq!(ValueExpression::parse("$0").resolve(&r), None);
        assert_eq!(ValueExpression::parse("x$2").resolve(&r), None);
        assert_eq!(ValueExpression::parse("$").resolve(&r).as_deref(), Some("$"));
    }

    #[test]
    fn detects_bare_reference() {
        assert_eq!(single_column(" $3 "), Some(3));
        assert_eq!(single_column("$3x"), None);
    }

    #[test]
    fn numbers_and_positions() {
        assert_eq!(parse_number(" 2.5 "), Some(2.5));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_position("4.9"), Some(4));
        assert_eq!(parse_position("-1"), None);
        assert_eq!(format_decimal(502.0), "502.0");
        assert_eq!(format_decimal(0.5), "0.5");
    }
}
