// src/compute/awk.rs
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tracing::{debug, error, warn};

use super::psl::{select_columns, split_fields};
use crate::pipeline::ComputeContext;
use crate::table::{csv_to_table, line_to_list, SourceTable, TABLE_SEP};

static FILE_REF: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"\$\{file::(.*?)\}")
        .case_insensitive(true)
        .build()
        .expect("valid file ref regex")
});

pub struct AwkOptions<'a> {
    pub script: &'a str,
    pub keep: Option<&'a str>,
    pub exclude: Option<&'a str>,
    pub separators: Option<&'a str>,
    pub select_columns: Option<&'a str>,
}

/// Script text: the embedded file a `${file::name}` points at, or the
/// script itself.
fn resolve_script<'s>(script: &'s str, ctx: &ComputeContext<'s>) -> Result<&'s str> {
    match FILE_REF.captures(script).and_then(|caps| caps.get(1)) {
        Some(name) => ctx
            .store
            .embedded_file(ctx.connector_id, name.as_str())
            .with_context(|| format!("embedded file {:?} not found", name.as_str())),
        None => Ok(script),
    }
}

fn compile_filter(pattern: Option<&str>, what: &str) -> Option<Regex> {
    let pattern = pattern.filter(|p| !p.is_empty())?;
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("awk: ignoring invalid {} regex {:?}: {}", what, pattern, e);
            None
        }
    }
}

pub fn awk(
    table: &mut SourceTable,
    options: &AwkOptions,
    ctx: &ComputeContext,
    compute_key: &str,
) -> Result<()> {
    let script = resolve_script(options.script, ctx)?;
    let input = table.text_or_serialized();
    debug!("awk: script:\n{}\n", script);

    let output = match ctx
        .awk
        .run(script, &input, options.separators, ctx.awk_timeout)
    {
        Ok(out) => out,
        Err(e) => {
            error!(
                "Hostname {} - {} awk failed for connector {}, the table will be empty: {}",
                ctx.hostname, compute_key, ctx.connector_id, e
            );
            debug!("awk: error chain: {:?}", e);
            table.clear();
            return Ok(());
        }
    };
    if output.is_empty() {
        warn!(
            "Hostname {} - {} awk result is empty, the table will be empty",
            ctx.hostname, compute_key
        );
        table.clear();
        return Ok(());
    }

    let keep = compile_filter(options.keep, "keep");
    let exclude = compile_filter(options.exclude, "exclude");
    let separators = options.separators.filter(|s| !s.is_empty());
    let selection: String = options
        .select_columns
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if separators.is_none() {
        debug!("awk: no separators, lines are kept whole");
    }

    let raw = line_to_list(&output, "\n")
        .into_iter()
        .filter(|line| keep.as_ref().map_or(true, |re| re.is_match(line)))
        .filter(|line| !exclude.as_ref().is_some_and(|re| re.is_match(line)))
        .map(|line| match separators {
            Some(seps) if !selection.is_empty() => {
                select_columns(&split_fields(&line, seps), &selection).join(TABLE_SEP)
            }
            _ => line,
        })
        .map(|line| {
            if line.ends_with(TABLE_SEP) {
                line
            } else {
                line + TABLE_SEP
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    table.table = csv_to_table(&raw, TABLE_SEP);
    table.raw_data = Some(raw);
    Ok(())
}
