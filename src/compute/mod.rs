// src/compute/mod.rs
pub mod arithmetic;
pub mod awk;
pub mod convert;
pub mod directive;
pub mod filter;
pub mod json;
pub mod psl;
pub mod reshape;
pub mod translate;
pub mod xml;

pub use directive::{Compute, ConversionType};

use anyhow::Result;

use crate::pipeline::ComputeContext;
use crate::table::SourceTable;
use crate::translation::TranslationResolver;
use arithmetic::Operation;
use filter::Mode;

/// Apply one directive to `table`. An `Err` means the table was left as it
/// was before the call. `compute_key` names the step in log lines.
pub fn apply(
    compute: &Compute,
    table: &mut SourceTable,
    ctx: &ComputeContext,
    compute_key: &str,
) -> Result<()> {
    let resolver = TranslationResolver::new(ctx.connector_id, ctx.store);

    match compute {
        Compute::Add { column, value } => arithmetic::apply(table, Operation::Add, *column, value),
        Compute::Subtract { column, value } => {
            arithmetic::apply(table, Operation::Subtract, *column, value)
        }
        Compute::Multiply { column, value } => {
            arithmetic::apply(table, Operation::Multiply, *column, value)
        }
        Compute::Divide { column, value } => {
            arithmetic::apply(table, Operation::Divide, *column, value)
        }
        Compute::And { column, value } => arithmetic::apply(table, Operation::And, *column, value),
        Compute::Prepend { column, value } => reshape::prepend(table, *column, value.as_deref()),
        Compute::Append { column, value } => reshape::append(table, *column, value.as_deref()),
        Compute::Replace {
            column,
            existing_value,
            new_value,
        } => reshape::replace(
            table,
            *column,
            existing_value.as_deref(),
            new_value.as_deref(),
        ),
        Compute::Substring {
            column,
            start,
            length,
        } => reshape::substring(table, *column, start, length),
        Compute::Extract {
            column,
            sub_column,
            sub_separators,
        } => reshape::extract(table, *column, *sub_column, sub_separators.as_deref()),
        Compute::DuplicateColumn { column, insert_at } => {
            reshape::duplicate_column(table, *column, *insert_at)
        }
        Compute::KeepColumns { column_numbers } => reshape::keep_columns(table, column_numbers),
        Compute::ExtractPropertyFromWbemPath { column, property } => {
            reshape::extract_property_from_wbem_path(table, *column, property)
        }
        Compute::KeepOnlyMatchingLines {
            column,
            reg_exp,
            value_list,
        } => filter::apply(
            table,
            Mode::Keep,
            *column,
            reg_exp.as_deref(),
            value_list.as_deref(),
        ),
        Compute::ExcludeMatchingLines {
            column,
            reg_exp,
            value_list,
        } => filter::apply(
            table,
            Mode::Exclude,
            *column,
            reg_exp.as_deref(),
            value_list.as_deref(),
        ),
        Compute::Translate {
            column,
            translation_table,
        } => translate::translate(table, *column, translation_table, &resolver),
        Compute::ArrayTranslate {
            column,
            translation_table,
            array_separator,
            result_separator,
        } => translate::array_translate(
            table,
            *column,
            translation_table,
            array_separator.as_deref(),
            result_separator.as_deref(),
            &resolver,
        ),
        Compute::PerBitTranslation {
            column,
            bit_list,
            translation_table,
        } => translate::per_bit_translation(table, *column, bit_list, translation_table, &resolver),
        Compute::Convert { column, conversion } => convert::apply(table, *column, *conversion),
        Compute::Json2Csv {
            entry_key,
            separator,
            properties,
        } => json::json_to_csv(table, entry_key.as_deref(), separator, properties.as_deref()),
        Compute::Xml2Csv {
            record_tag,
            properties,
        } => xml::xml_to_csv(table, record_tag.as_deref(), properties.as_deref()),
        Compute::Awk {
            script,
            keep,
            exclude,
            separators,
            select_columns,
        } => awk::awk(
            table,
            &awk::AwkOptions {
                script,
                keep: keep.as_deref(),
                exclude: exclude.as_deref(),
                separators: separators.as_deref(),
                select_columns: select_columns.as_deref(),
            },
            ctx,
            compute_key,
        ),
    }?;

    if !compute.writes_raw_data() {
        table.refresh_raw_data();
    }
    Ok(())
}
