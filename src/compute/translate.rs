// src/compute/translate.rs
//! Translate, ArrayTranslate and PerBitTranslation.

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::table::{splice_cell, SourceTable};
use crate::translation::{TranslationResolver, TranslationTable, TranslationTableRef};

pub const DEFAULT_ARRAY_SEPARATOR: &str = "|";
pub const BIT_DESCRIPTION_SEPARATOR: &str = " - ";

fn column_index(column: i64) -> Result<usize> {
    if column < 1 {
        bail!("invalid column index {}", column);
    }
    Ok((column - 1) as usize)
}

fn lookup<'t>(
    resolver: &TranslationResolver<'t>,
    reference: &'t TranslationTableRef,
) -> Result<&'t TranslationTable> {
    resolver.resolve(reference).with_context(|| match reference.table_name() {
        Some(name) => format!("translation table {:?} not found", name),
        None => "translation table not found".to_string(),
    })
}

pub fn translate(
    table: &mut SourceTable,
    column: i64,
    reference: &TranslationTableRef,
    resolver: &TranslationResolver<'_>,
) -> Result<()> {
    let index = column_index(column)?;
    let translations = lookup(resolver, reference)?;

    for row in table.table.iter_mut() {
        let Some(value) = row.get(index) else {
            continue;
        };
        match translations.get_or_default(value) {
            Some(translated) => {
                let translated = translated.to_string();
                splice_cell(row, index, translated);
            }
            None => debug!("translate: no translation for {:?}", value),
        }
    }
    Ok(())
}

pub fn array_translate(
    table: &mut SourceTable,
    column: i64,
    reference: &TranslationTableRef,
    array_separator: Option<&str>,
    result_separator: Option<&str>,
    resolver: &TranslationResolver<'_>,
) -> Result<()> {
    let index = column_index(column)?;
    let translations = lookup(resolver, reference)?;
    let array_separator = array_separator
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_ARRAY_SEPARATOR);
    let result_separator = result_separator.unwrap_or(DEFAULT_ARRAY_SEPARATOR);

    for row in table.table.iter_mut() {
        let Some(value) = row.get_mut(index) else {
            continue;
        };
        let mut elements: Vec<&str> = value.split(array_separator).collect();
        // `a|b|` carries no trailing element
        while elements.len() > 1 && elements.last().is_some_and(|e| e.is_empty()) {
            elements.pop();
        }
        let translated = elements
            .into_iter()
            .filter_map(|element| translations.get_or_default(element))
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join(result_separator);
        *value = translated;
    }
    Ok(())
}

pub fn per_bit_translation(
    table: &mut SourceTable,
    column: i64,
    bit_list: &str,
    reference: &TranslationTableRef,
    resolver: &TranslationResolver<'_>,
) -> Result<()> {
    let index = column_index(column)?;
    let bits = bit_list
        .split(',')
        .map(|b| {
            b.trim()
                .parse::<u32>()
                .with_context(|| format!("invalid bit position {:?}", b))
        })
        .collect::<Result<Vec<_>>>()?;
    let translations = lookup(resolver, reference)?;

    for row in table.table.iter_mut() {
        let Some(value) = row.get_mut(index) else {
            continue;
        };
        let Some(number) = value.trim().parse::<f64>().ok().filter(|v| v.is_finite()) else {
            debug!("per_bit_translation: {:?} is not an integer, row unchanged", value);
            continue;
        };
        let number = number as i64;

        let described = bits
            .iter()
            .filter_map(|&bit| {
                let bit_value = if bit < 64 { (number >> bit) & 1 } else { 0 };
                translations.get(&format!("{},{}", bit, bit_value))
            })
            .filter(|d| !d.is_empty())
            .collect::<Vec<_>>()
            .join(BIT_DESCRIPTION_SEPARATOR);
        *value = described;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{Connector, InMemoryConnectorStore};
    use crate::test_support::rows;

    fn store() -> InMemoryConnectorStore {
        let connector: Connector = serde_yaml::from_str(
            r#"
id: Raid
translations:
  StatusTable:
    ok: "OK;healthy"
    "2": degraded
    Default: UNKNOWN
  ArrayTable:
    status11: A
    status12: B
    status13: C
    "": NO_VALUE
  BitTable:
    "0,1": No Network
    "1,0": Authentication Failure
    "1,1": Not Ready
"#,
        )
        .expect("valid connector");
        InMemoryConnectorStore::from_connectors(vec![connector])
    }

    fn reference(name: &str) -> TranslationTableRef {
        TranslationTableRef::Reference(format!("${{translation::{}}}", name))
    }

    #[test]
    fn translate_splits_and_falls_back_to_default() -> Result<()> {
        let store = store();
        let resolver = TranslationResolver::new("Raid", &store);
        let mut t = SourceTable::new(rows(&[&["ID1", "OK"], &["ID2", "2"], &["ID3", "9"]]));
        translate(&mut t, 2, &reference("StatusTable"), &resolver)?;
        assert_eq!(
            t.table,
            rows(&[
                &["ID1", "OK", "healthy"],
                &["ID2", "degraded"],
                &["ID3", "UNKNOWN"]
            ])
        );
        Ok(())
    }

    #[test]
    fn unknown_table_is_an_error() {
        let store = store();
        let resolver = TranslationResolver::new("Raid", &store);
        let mut t = SourceTable::new(rows(&[&["OK"]]));
        assert!(translate(&mut t, 1, &reference("Missing"), &resolver).is_err());
        assert_eq!(t.table, rows(&[&["OK"]]));
    }

    #[test]
    fn array_translate_elements() -> Result<()> {
        let store = store();
        let resolver = TranslationResolver::new("Raid", &store);
        let mut t = SourceTable::new(rows(&[
            &["STATUS11,STATUS12,STATUS13"],
            &[",STATUS12,unknown"],
        ]));
        array_translate(&mut t, 1, &reference("ArrayTable"), Some(","), Some("|"), &resolver)?;
        assert_eq!(t.table, rows(&[&["A|B|C"], &["NO_VALUE|B"]]));

        let mut t = SourceTable::new(rows(&[&["STATUS11|STATUS13"]]));
        array_translate(&mut t, 1, &reference("ArrayTable"), None, None, &resolver)?;
        assert_eq!(t.table[0][0], "A|C");
        Ok(())
    }

    #[test]
    fn per_bit_descriptions() -> Result<()> {
        let store = store();
        let resolver = TranslationResolver::new("Raid", &store);
        let mut t = SourceTable::new(rows(&[&["1"], &["2"], &["n/a"], &[]]));
        per_bit_translation(&mut t, 1, "0,1", &reference("BitTable"), &resolver)?;
        assert_eq!(t.table[0][0], "No Network - Authentication Failure");
        assert_eq!(t.table[1][0], "Not Ready");
        assert_eq!(t.table[2][0], "n/a");

        assert!(per_bit_translation(&mut t, 1, "0,x", &reference("BitTable"), &resolver).is_err());
        Ok(())
    }

    #[test]
    fn inline_tables_need_no_store() -> Result<()> {
        let store = InMemoryConnectorStore::default();
        let resolver = TranslationResolver::new("Any", &store);
        let inline = TranslationTableRef::Inline(
            [("1,0", "Auth Fail"), ("1,1", "Not Ready")].into_iter().collect(),
        );
        let mut t = SourceTable::new(rows(&[&["2"]]));
        per_bit_translation(&mut t, 1, "0,1", &inline, &resolver)?;
        assert_eq!(t.table[0][0], "Not Ready");
        Ok(())
    }
}
