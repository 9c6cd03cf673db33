//! Structured record types.
//!
//! Field names are camelCase and fixed for downstream consumers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The structured record for one processed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    /// Key of the source document
    pub original_source_key: String,

    /// Identifier of the analysis job
    pub processing_job_id: String,

    /// Document-level metadata
    pub document_metadata: DocumentMetadata,

    /// Reconstructed tables
    pub tables: Vec<TableRecord>,

    /// Form fields
    pub key_value_pairs: Vec<KeyValuePair>,

    /// Every LINE block, resolved
    pub raw_lines: Vec<RawLine>,
}

impl DocumentRecord {
    /// Create an empty record.
    pub fn new(original_source_key: impl Into<String>, processing_job_id: impl Into<String>) -> Self {
        Self {
            original_source_key: original_source_key.into(),
            processing_job_id: processing_job_id.into(),
            document_metadata: DocumentMetadata::default(),
            tables: Vec::new(),
            key_value_pairs: Vec::new(),
            raw_lines: Vec::new(),
        }
    }
}

/// Document-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Number of PAGE blocks
    pub page_count: usize,
}

/// One table in the structured record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRecord {
    pub table_id: String,
    pub page_number: Option<u32>,
    pub confidence: Option<f64>,
    pub row_count: usize,
    pub column_count: usize,
    pub spatially_reconstructed: bool,
    pub rows: Vec<RowRecord>,

    /// Set when header consolidation rewrote the table
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub restructured: bool,

    /// Row count before header consolidation
    #[serde(
        rename = "original_row_count",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub original_row_count: Option<usize>,

    /// Analysis that drove header consolidation
    #[serde(rename = "ai_analysis", default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<Value>,
}

impl TableRecord {
    /// Cell texts, row-major.
    pub fn texts(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| r.cells.iter().map(|c| c.text.clone()).collect())
            .collect()
    }
}

/// One row in a table record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowRecord {
    pub row_index: usize,
    pub cells: Vec<CellRecord>,
}

/// One cell in a table record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRecord {
    pub cell_id: String,
    pub row_index: usize,
    pub column_index: usize,
    pub row_span: u32,
    pub column_span: u32,
    pub text: String,
    pub confidence: f64,
    pub geometry: Option<Value>,
    pub spatially_reconstructed: bool,
}

impl CellRecord {
    /// An empty 1x1 cell with no geometry.
    pub fn blank(cell_id: impl Into<String>, row_index: usize, column_index: usize) -> Self {
        Self {
            cell_id: cell_id.into(),
            row_index,
            column_index,
            row_span: 1,
            column_span: 1,
            text: String::new(),
            confidence: 0.0,
            geometry: None,
            spatially_reconstructed: false,
        }
    }
}

/// A form field: key text paired with its value text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValuePair {
    pub key: String,
    pub key_confidence: f64,
    pub value: String,
    pub value_confidence: f64,
    pub key_geometry: Option<Value>,
    pub page_number: Option<u32>,
}

/// A LINE block, resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLine {
    pub line_id: String,
    pub text: String,
    pub confidence: f64,
    pub geometry: Option<Value>,
    pub page_number: Option<u32>,
}
