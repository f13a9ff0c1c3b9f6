use crate::error::{CorepError, Result};
use crate::schema::Report;
use crate::utils::{format_optional_currency, format_percentage, truncate_with_ellipsis};
use serde::{Deserialize, Serialize};

/// Source rules longer than this are cut in the table view.
pub const SOURCE_COLUMN_WIDTH: usize = 50;

/// One display row per template field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(rename = "Field")]
    pub field: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "Confidence")]
    pub confidence: String,
    #[serde(rename = "Source")]
    pub source: String,
}

impl Report {
    /// Canonical pretty-printed JSON: template order, `null` for absent values.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses canonical JSON back into a report, re-applying field invariants.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_table(&self) -> Vec<TableRow> {
        self.fields()
            .iter()
            .map(|field| TableRow {
                field: field.field_code().to_string(),
                description: field.description().to_string(),
                value: format_optional_currency(field.value()),
                confidence: format_percentage(field.confidence()),
                source: truncate_with_ellipsis(field.source_rule(), SOURCE_COLUMN_WIDTH),
            })
            .collect()
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in self.to_table() {
            writer
                .serialize(row)
                .map_err(|e| CorepError::ExportError(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| CorepError::ExportError(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| CorepError::ExportError(e.to_string()))
    }
}
