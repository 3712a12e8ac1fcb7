// src/connector/types.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::translation::TranslationTable;

/// The parts of a connector definition the compute engine reads.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    pub id: String,
    /// Named translation tables, referenced as `${translation::<name>}`.
    #[serde(default)]
    pub translations: HashMap<String, TranslationTable>,
    /// Embedded files (usually Awk scripts), referenced as `${file::<name>}`.
    #[serde(default)]
    pub embedded_files: HashMap<String, String>,
}
