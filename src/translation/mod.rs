// src/translation/mod.rs
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::connector::ConnectorStore;

/// Key used when nothing else matches.
pub const DEFAULT_KEY: &str = "default";

static TRANSLATION_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\$\{translation::([^\s}]+)\}\s*$").expect("valid translation ref regex")
});

/// Key → replacement map. Keys are folded to lower case on construction so
/// lookups are case-insensitive without depending on the host locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, String>", into = "HashMap<String, String>")]
pub struct TranslationTable {
    entries: HashMap<String, String>,
}

impl From<HashMap<String, String>> for TranslationTable {
    fn from(raw: HashMap<String, String>) -> Self {
        raw.into_iter().collect()
    }
}

impl From<TranslationTable> for HashMap<String, String> {
    fn from(table: TranslationTable) -> Self {
        table.entries
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for TranslationTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (fold(k.as_ref()), v.into()))
                .collect(),
        }
    }
}

impl TranslationTable {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&fold(key)).map(String::as_str)
    }

    /// `get`, falling back to the `default` entry.
    pub fn get_or_default(&self, key: &str) -> Option<&str> {
        self.get(key).or_else(|| self.get(DEFAULT_KEY))
    }
}

fn fold(key: &str) -> String {
    key.to_lowercase()
}

/// How a directive names its translation table: a `${translation::name}`
/// reference (or bare name) resolved against the connector, or a table
/// carried inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranslationTableRef {
    Reference(String),
    Inline(TranslationTable),
}

impl TranslationTableRef {
    /// Name the reference points at.
    pub fn table_name(&self) -> Option<&str> {
        match self {
            TranslationTableRef::Inline(_) => None,
            TranslationTableRef::Reference(text) => Some(
                TRANSLATION_REF
                    .captures(text)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str())
                    .unwrap_or_else(|| text.trim()),
            ),
        }
    }
}

/// Read-only capability handed to translation directives.
#[derive(Clone, Copy)]
pub struct TranslationResolver<'a> {
    connector_id: &'a str,
    store: &'a dyn ConnectorStore,
}

impl<'a> TranslationResolver<'a> {
    pub fn new(connector_id: &'a str, store: &'a dyn ConnectorStore) -> Self {
        Self {
            connector_id,
            store,
        }
    }

    pub fn resolve<'r>(&self, reference: &'r TranslationTableRef) -> Option<&'r TranslationTable>
    where
        'a: 'r,
    {
        match reference {
            TranslationTableRef::Inline(table) => Some(table),
            TranslationTableRef::Reference(_) => {
                let name = reference.table_name()?;
                self.store.translation_table(self.connector_id, name)
            }
        }
    }
}
