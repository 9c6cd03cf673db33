//! JSON rendering for structured records.

use crate::error::{Error, Result};
use crate::model::DocumentRecord;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert a structured record to JSON.
pub fn to_json(record: &DocumentRecord, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(record),
        JsonFormat::Compact => serde_json::to_string(record),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}
