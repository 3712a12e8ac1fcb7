// src/compute/psl.rs
//! Helpers for the legacy PSL dialect that connector definitions are written
//! in: `grep()`-style regular expressions and `ntharg` column selections.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Characters whose backslash escape is carried over unchanged.
const SPECIAL_CHARACTERS: &str = "^$.*+?[]\\";

/// Translate a PSL regular expression into `regex` syntax.
///
/// In PSL `( ) | { }` are plain characters, `\<` and `\>` are word
/// boundaries, and a regex made of a single `.` means "anything non-empty".
pub fn psl_to_regex(psl: &str) -> String {
    if psl.is_empty() {
        return String::new();
    }
    if psl == "." {
        return ".+".to_string();
    }

    let chars: Vec<char> = psl.chars().collect();
    let mut out = String::with_capacity(psl.len() + 8);
    let mut in_range = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if i + 1 < chars.len() => {
                if in_range {
                    out.push_str("\\\\");
                } else {
                    let next = chars[i + 1];
                    if next == '<' || next == '>' {
                        out.push_str("\\b");
                    } else if SPECIAL_CHARACTERS.contains(next) {
                        out.push('\\');
                        out.push(next);
                    } else {
                        push_literal(&mut out, next);
                    }
                    i += 1;
                }
            }
            '(' | ')' | '|' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '[' => {
                out.push(c);
                in_range = true;
            }
            ']' => {
                out.push(c);
                in_range = false;
            }
            _ => out.push(c),
        }
        i += 1;
    }
    out
}

/// A character that follows a PSL backslash but has no meaning there.
fn push_literal(out: &mut String, c: char) {
    if c.is_ascii_punctuation() {
        out.push('\\');
    }
    out.push(c);
}

/// Convert then compile, case-insensitively.
pub fn compile_psl(psl: &str) -> Result<Regex> {
    let pattern = psl_to_regex(psl);
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("invalid regular expression {:?} (from {:?})", pattern, psl))
}

/// Split `line` at any character of `separators`, keeping empty fields.
pub fn split_fields<'a>(line: &'a str, separators: &str) -> Vec<&'a str> {
    line.split(|c: char| separators.contains(c)).collect()
}

/// Select fields out of `fields` by an `ntharg` column list: comma separated
/// 1-based items, each `n`, `m-n`, `m-` or `-n`. Items that fall outside
/// the available fields select nothing.
pub fn select_columns<'a>(fields: &[&'a str], select: &str) -> Vec<&'a str> {
    let mut out = Vec::new();
    for item in select.split(',') {
        let Some((from, to)) = column_range(item.trim(), fields.len()) else {
            continue;
        };
        if from >= 1 && from <= to {
            out.extend_from_slice(&fields[from - 1..to]);
        }
    }
    out
}

/// Inclusive 1-based range for one selection item.
fn column_range(item: &str, count: usize) -> Option<(usize, usize)> {
    let range = match item.find('-') {
        None => {
            let n = item.parse().ok()?;
            (n, n)
        }
        Some(0) => (1, item[1..].parse().ok()?),
        Some(dash) if dash == item.len() - 1 => (item[..dash].parse().ok()?, count),
        Some(dash) => {
            let from = item[..dash].parse().ok()?;
            let to: usize = item[dash + 1..].parse().ok()?;
            (from, to.min(count))
        }
    };

    if range.0 > count || range.1 > count {
        warn!(
            "column_range: invalid range for a {}-length line: [{}-{}]",
            count, range.0, range.1
        );
        return None;
    }
    Some(range)
}
