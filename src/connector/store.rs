// src/connector/store.rs
use anyhow::{Context, Result};
use std::{collections::HashMap, fs, path::Path};
use tracing::{debug, error, info};

use super::types::Connector;
use crate::translation::TranslationTable;

/// Read-only view of loaded connectors. Shared by every pipeline, so it must
/// tolerate concurrent readers.
pub trait ConnectorStore: Send + Sync {
    fn translation_table(&self, connector_id: &str, name: &str) -> Option<&TranslationTable>;

    /// Content of an embedded file (an Awk script, typically) by name.
    fn embedded_file(&self, connector_id: &str, name: &str) -> Option<&str>;
}

/// Connectors keyed by lower-cased id. Populated once at startup, never
/// written afterwards.
#[derive(Debug, Default)]
pub struct InMemoryConnectorStore {
    connectors: HashMap<String, IndexedConnector>,
}

#[derive(Debug)]
struct IndexedConnector {
    translations: HashMap<String, TranslationTable>,
    embedded_files: HashMap<String, String>,
}

impl From<Connector> for IndexedConnector {
    fn from(c: Connector) -> Self {
        Self {
            translations: c
                .translations
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
            embedded_files: c
                .embedded_files
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
        }
    }
}

impl InMemoryConnectorStore {
    pub fn from_connectors(connectors: impl IntoIterator<Item = Connector>) -> Self {
        let mut store = Self::default();
        for connector in connectors {
            store.insert(connector);
        }
        store
    }

    /// Load every `*.yaml` / `*.yml` connector in `dir`. A missing directory
    /// yields an empty store; unreadable or corrupt files are skipped.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let mut store = Self::default();

        if !dir.is_dir() {
            info!("load_dir: connector directory {:?} not found, starting empty", dir);
            return Ok(store);
        }

        for ext in ["yaml", "yml"] {
            let pattern = dir.join(format!("*.{}", ext));
            let pattern = pattern
                .to_str()
                .with_context(|| format!("non UTF-8 connector path {:?}", dir))?;

            for entry in glob::glob(pattern).context("invalid connector glob")? {
                let path = match entry {
                    Ok(p) => p,
                    Err(e) => {
                        error!("load_dir: unreadable entry: {}", e);
                        continue;
                    }
                };
                match read_connector(&path) {
                    Ok(connector) => {
                        debug!("load_dir: loaded connector {} from {:?}", connector.id, path);
                        store.insert(connector);
                    }
                    Err(e) => error!("Skipping corrupt {:?}: {:#}", path, e),
                }
            }
        }

        info!(
            "load_dir: {} connector(s) loaded from {:?}",
            store.connectors.len(),
            dir
        );
        Ok(store)
    }

    pub fn insert(&mut self, connector: Connector) {
        let id = connector.id.to_lowercase();
        self.connectors.insert(id, connector.into());
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    fn connector(&self, connector_id: &str) -> Option<&IndexedConnector> {
        self.connectors.get(&connector_id.to_lowercase())
    }
}

fn read_connector(path: &Path) -> Result<Connector> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let connector: Connector =
        serde_yaml::from_str(&text).with_context(|| format!("parsing {:?}", path))?;
    anyhow::ensure!(!connector.id.trim().is_empty(), "connector without id");
    Ok(connector)
}

impl ConnectorStore for InMemoryConnectorStore {
    fn translation_table(&self, connector_id: &str, name: &str) -> Option<&TranslationTable> {
        self.connector(connector_id)?
            .translations
            .get(&name.to_lowercase())
    }

    fn embedded_file(&self, connector_id: &str, name: &str) -> Option<&str> {
        self.connector(connector_id)?
            .embedded_files
            .get(&name.to_lowercase())
            .map(String::as_str)
    }
}
