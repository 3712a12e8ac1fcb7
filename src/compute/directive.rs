// src/compute/directive.rs

use serde::{Deserialize, Serialize};

use crate::translation::TranslationTableRef;

fn default_json_separator() -> String {
    ";".to_string()
}

/// One declarative transformation step. Directive lists are written as a
/// sequence of objects tagged by `type`, e.g.
/// `{type: add, column: 2, value: "$3"}`. Column numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Compute {
    Add {
        column: i64,
        value: String,
    },
    Subtract {
        column: i64,
        value: String,
    },
    Multiply {
        column: i64,
        value: String,
    },
    Divide {
        column: i64,
        value: String,
    },
    And {
        column: i64,
        value: String,
    },
    Prepend {
        column: i64,
        #[serde(default)]
        value: Option<String>,
    },
    Append {
        column: i64,
        #[serde(default)]
        value: Option<String>,
    },
    Replace {
        column: i64,
        #[serde(default)]
        existing_value: Option<String>,
        #[serde(default)]
        new_value: Option<String>,
    },
    Substring {
        column: i64,
        start: String,
        length: String,
    },
    Extract {
        column: i64,
        sub_column: i64,
        #[serde(default)]
        sub_separators: Option<String>,
    },
    DuplicateColumn {
        column: i64,
        /// 0-based destination; defaults to right after the source.
        #[serde(default)]
        insert_at: Option<i64>,
    },
    KeepColumns {
        column_numbers: String,
    },
    ExtractPropertyFromWbemPath {
        column: i64,
        property: String,
    },
    KeepOnlyMatchingLines {
        column: i64,
        #[serde(default)]
        reg_exp: Option<String>,
        #[serde(default)]
        value_list: Option<String>,
    },
    ExcludeMatchingLines {
        column: i64,
        #[serde(default)]
        reg_exp: Option<String>,
        #[serde(default)]
        value_list: Option<String>,
    },
    Translate {
        column: i64,
        translation_table: TranslationTableRef,
    },
    ArrayTranslate {
        column: i64,
        translation_table: TranslationTableRef,
        #[serde(default)]
        array_separator: Option<String>,
        #[serde(default)]
        result_separator: Option<String>,
    },
    PerBitTranslation {
        column: i64,
        bit_list: String,
        translation_table: TranslationTableRef,
    },
    Convert {
        column: i64,
        conversion: ConversionType,
    },
    Json2Csv {
        #[serde(default)]
        entry_key: Option<String>,
        #[serde(default = "default_json_separator")]
        separator: String,
        #[serde(default)]
        properties: Option<String>,
    },
    Xml2Csv {
        #[serde(default)]
        record_tag: Option<String>,
        #[serde(default)]
        properties: Option<String>,
    },
    Awk {
        script: String,
        #[serde(default)]
        keep: Option<String>,
        #[serde(default)]
        exclude: Option<String>,
        #[serde(default)]
        separators: Option<String>,
        #[serde(default)]
        select_columns: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionType {
    #[serde(rename = "HEX_2_DEC", alias = "hex2Dec")]
    Hex2Dec,
    #[serde(rename = "ARRAY_2_SIMPLE_STATUS", alias = "array2SimpleStatus")]
    Array2SimpleStatus,
}

impl Compute {
    /// Kind name as it appears in directive files.
    pub fn kind(&self) -> &'static str {
        match self {
            Compute::Add { .. } => "add",
            Compute::Subtract { .. } => "subtract",
            Compute::Multiply { .. } => "multiply",
            Compute::Divide { .. } => "divide",
            Compute::And { .. } => "and",
            Compute::Prepend { .. } => "prepend",
            Compute::Append { .. } => "append",
            Compute::Replace { .. } => "replace",
            Compute::Substring { .. } => "substring",
            Compute::Extract { .. } => "extract",
            Compute::DuplicateColumn { .. } => "duplicateColumn",
            Compute::KeepColumns { .. } => "keepColumns",
            Compute::ExtractPropertyFromWbemPath { .. } => "extractPropertyFromWbemPath",
            Compute::KeepOnlyMatchingLines { .. } => "keepOnlyMatchingLines",
            Compute::ExcludeMatchingLines { .. } => "excludeMatchingLines",
            Compute::Translate { .. } => "translate",
            Compute::ArrayTranslate { .. } => "arrayTranslate",
            Compute::PerBitTranslation { .. } => "perBitTranslation",
            Compute::Convert { .. } => "convert",
            Compute::Json2Csv { .. } => "json2Csv",
            Compute::Xml2Csv { .. } => "xml2Csv",
            Compute::Awk { .. } => "awk",
        }
    }

    /// Directives that manage `rawData` themselves rather than having it
    /// regenerated from the table afterwards.
    pub fn writes_raw_data(&self) -> bool {
        matches!(
            self,
            Compute::Json2Csv { .. } | Compute::Xml2Csv { .. } | Compute::Awk { .. }
        )
    }

    /// Directives whose failures come from parsing foreign documents, logged
    /// as errors rather than degradations.
    pub fn parses_documents(&self) -> bool {
        matches!(self, Compute::Json2Csv { .. } | Compute::Xml2Csv { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_directive_list() -> anyhow::Result<()> {
        let yaml = r#"
- type: add
  column: 2
  value: "$3"
- type: keepOnlyMatchingLines
  column: 1
  regExp: "^ID"
- type: translate
  column: 3
  translationTable: "${translation::StatusTable}"
- type: arrayTranslate
  column: 2
  translationTable: {STATUS11: A}
  arraySeparator: ","
- type: convert
  column: 1
  conversion: HEX_2_DEC
- type: json2Csv
  entryKey: /monitors
  properties: id;name
- type: duplicateColumn
  column: 1
"#;
        let computes: Vec<Compute> = serde_yaml::from_str(yaml)?;
        assert_eq!(computes.len(), 7);
        let parsers: Vec<bool> = computes.iter().map(Compute::parses_documents).collect();
        assert_eq!(parsers, [false, false, false, false, false, true, false]);
        assert_eq!(
            computes[0],
            Compute::Add {
                column: 2,
                value: "$3".into()
            }
        );
        assert!(matches!(
            &computes[1],
            Compute::KeepOnlyMatchingLines { reg_exp: Some(r), value_list: None, .. } if r == "^ID"
        ));
        assert!(matches!(
            &computes[2],
            Compute::Translate { translation_table: TranslationTableRef::Reference(_), .. }
        ));
        assert!(matches!(
            &computes[3],
            Compute::ArrayTranslate { translation_table: TranslationTableRef::Inline(_), result_separator: None, .. }
        ));
        assert!(matches!(
            computes[4],
            Compute::Convert { conversion: ConversionType::Hex2Dec, .. }
        ));
        assert!(matches!(&computes[5], Compute::Json2Csv { separator, .. } if separator == ";"));
        assert_eq!(computes[6].kind(), "duplicateColumn");
        Ok(())
    }

    #[test]
    fn rejects_unknown_kind() {
        let parsed: Result<Compute, _> = serde_json::from_str(r#"{"type":"leftConcat","column":1}"#);
        assert!(parsed.is_err());
    }
}
