// src/compute/json.rs
//! Json2Csv: flatten an array of JSON objects held in `rawData` into
//! separator-joined lines.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::table::{line_to_list, SourceTable, TABLE_SEP};

pub fn json_to_csv(
    table: &mut SourceTable,
    entry_key: Option<&str>,
    separator: &str,
    properties: Option<&str>,
) -> Result<()> {
    let raw = match table.raw_data.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => bail!("no JSON to flatten"),
    };
    let properties = line_to_list(properties.context("no properties")?, TABLE_SEP);
    if properties.is_empty() {
        bail!("no properties");
    }

    let document: Value = serde_json::from_str(raw).context("parsing JSON rawData")?;
    let entry_key = entry_key.map(str::trim).unwrap_or("");
    let selected = select_entry(&document, entry_key)
        .with_context(|| format!("entry key {:?} not found", entry_key))?;

    let entries: Vec<&Value> = match selected {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let prefix = entry_key.trim_end_matches('/');
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        out.push_str(&format!("{}[{}]", prefix, i));
        out.push_str(separator);
        for property in &properties {
            out.push_str(&render(lookup(entry, property)));
            out.push_str(separator);
        }
        out.push('\n');
    }

    debug!("json_to_csv: {} entry(ies) under {:?}", entries.len(), entry_key);
    table.raw_data = Some(out);
    Ok(())
}

/// Walk a `/`-delimited path; the empty path and `/` are the root.
fn select_entry<'v>(document: &'v Value, entry_key: &str) -> Option<&'v Value> {
    entry_key
        .split('/')
        .filter(|s| !s.is_empty())
        .try_fold(document, |node, segment| step(node, segment))
}

/// Dotted property path, each segment optionally indexed: `disks[1].name`.
fn lookup<'v>(entry: &'v Value, property: &str) -> Option<&'v Value> {
    property
        .split('.')
        .try_fold(entry, |node, segment| step(node, segment))
}

fn step<'v>(node: &'v Value, segment: &str) -> Option<&'v Value> {
    let (name, index) = split_index(segment);
    let mut current = if name.is_empty() {
        node
    } else {
        match node {
            Value::Object(map) => map.get(name)?,
            Value::Array(items) => items.get(name.parse::<usize>().ok()?)?,
            _ => return None,
        }
    };
    if let Some(i) = index {
        current = current.as_array()?.get(i)?;
    }
    Some(current)
}

fn split_index(segment: &str) -> (&str, Option<usize>) {
    if let Some(open) = segment.find('[') {
        if segment.ends_with(']') {
            if let Ok(i) = segment[open + 1..segment.len() - 1].parse() {
                return (&segment[..open], Some(i));
            }
        }
    }
    (segment, None)
}

fn render(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}
