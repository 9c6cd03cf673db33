//! # ocrtable
//!
//! Table reconstruction and structured export for OCR block graphs.
//!
//! This library takes the flat block list produced by a document analysis
//! service (pages, lines, words, tables, cells, form fields) and turns it
//! into two artifacts: a CSV dump of every table and a structured JSON
//! record with tables, key/value pairs and raw lines.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ocrtable::{parse_file, process};
//!
//! fn main() -> ocrtable::Result<()> {
//!     // Load the analysis output
//!     let graph = parse_file("blocks.json")?;
//!
//!     // Reconstruct tables and build both artifacts
//!     let processed = process(&graph, "uploads/invoice.pdf", "job-1")?;
//!     println!("{}", processed.csv()?);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Geometry first**: tables are rebuilt from word bounding boxes, with the
//!   declared cell structure as fallback
//! - **Self-scaling tolerances**: row and column tolerances follow the data
//! - **Form fields**: key/value pairs with their own confidence policy
//! - **Header consolidation**: pluggable analysis of multi-row headers
//! - **Job plumbing**: notification in, artifacts and webhook out
//! - **Parallel batches**: uses Rayon for independent documents

pub mod convert;
pub mod error;
pub mod model;
pub mod parser;
pub mod render;

// Re-export commonly used types
pub use convert::job::{
    ArtifactSink, BlockSource, FileBlockSource, FsArtifactSink, JobNotification, JobOutcome,
    JobRunner, JobStatus, Notifier, OutputLayout, PayloadStatus, WebhookPayload,
};
pub use convert::{
    process_batch, BatchItem, ConsolidationPlan, DocumentProcessor, HeaderConsolidator,
    ProcessedDocument,
};
pub use error::{Error, Result};
pub use model::{
    Block, BlockGraph, BlockType, DocumentRecord, KeyValuePair, Provenance, RawLine, TableGrid,
    TableRecord, TableSet,
};
pub use parser::{ExtractOptions, SpatialConfig, SpatialReconstructor};
pub use render::{ExtractionStats, JsonFormat};

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Load a block graph from a JSON file.
///
/// # Example
///
/// ```no_run
/// use ocrtable::parse_file;
///
/// let graph = parse_file("blocks.json").unwrap();
/// println!("Blocks: {}", graph.len());
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<BlockGraph> {
    let json = std::fs::read_to_string(path)?;
    BlockGraph::from_json(&json)
}

/// Load a block graph from JSON text.
pub fn parse_str(json: &str) -> Result<BlockGraph> {
    BlockGraph::from_json(json)
}

/// Load a block graph from a reader.
pub fn parse_reader<R: Read>(mut reader: R) -> Result<BlockGraph> {
    let mut json = String::new();
    reader.read_to_string(&mut json)?;
    BlockGraph::from_json(&json)
}

/// Process a block graph with default options.
///
/// Fails with [`Error::EmptyDocument`] when the graph has no blocks.
pub fn process(graph: &BlockGraph, source_key: &str, job_id: &str) -> Result<ProcessedDocument> {
    DocumentProcessor::new().process(graph, source_key, job_id)
}

/// Convert a block file to CSV.
///
/// # Example
///
/// ```no_run
/// use ocrtable::to_csv;
///
/// let csv = to_csv("blocks.json").unwrap();
/// std::fs::write("tables.csv", csv).unwrap();
/// ```
pub fn to_csv<P: AsRef<Path>>(path: P) -> Result<String> {
    OcrTable::new().parse(path)?.csv()
}

/// Convert a block file to the structured JSON record.
pub fn to_json<P: AsRef<Path>>(path: P, format: JsonFormat) -> Result<String> {
    OcrTable::new().parse(path)?.json(format)
}

/// Builder for processing block files.
///
/// # Example
///
/// ```no_run
/// use ocrtable::OcrTable;
///
/// let json = OcrTable::new()
///     .structural_only()
///     .with_source_key("uploads/scan.pdf")
///     .parse("blocks.json")?
///     .json(ocrtable::JsonFormat::Pretty)?;
/// # Ok::<(), ocrtable::Error>(())
/// ```
#[derive(Default)]
pub struct OcrTable {
    options: ExtractOptions,
    consolidator: Option<Arc<dyn HeaderConsolidator>>,
    source_key: Option<String>,
    job_id: Option<String>,
}

impl OcrTable {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip geometry and use declared cell structure only.
    pub fn structural_only(mut self) -> Self {
        self.options = self.options.structural_only();
        self
    }

    /// Set spatial reconstruction tolerances.
    pub fn with_spatial_config(mut self, config: SpatialConfig) -> Self {
        self.options = self.options.with_spatial_config(config);
        self
    }

    /// Set the header row written when a document has no tables.
    pub fn with_line_fallback_header(mut self, header: impl Into<String>) -> Self {
        self.options = self.options.with_line_fallback_header(header);
        self
    }

    /// Consolidate table headers in the structured record.
    pub fn with_consolidator(mut self, consolidator: Arc<dyn HeaderConsolidator>) -> Self {
        self.consolidator = Some(consolidator);
        self
    }

    /// Set the source key recorded in the output (defaults to the file path).
    pub fn with_source_key(mut self, key: impl Into<String>) -> Self {
        self.source_key = Some(key.into());
        self
    }

    /// Set the job id recorded in the output (defaults to the file stem).
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Get the extraction options.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Process a block file.
    pub fn parse<P: AsRef<Path>>(self, path: P) -> Result<ProcessedDocument> {
        let path = path.as_ref();
        let graph = parse_file(path)?;
        let source_key = self
            .source_key
            .clone()
            .unwrap_or_else(|| path.display().to_string());
        let job_id = self.job_id.clone().unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        self.processor().process(&graph, &source_key, &job_id)
    }

    /// Process block JSON text.
    pub fn parse_str(self, json: &str) -> Result<ProcessedDocument> {
        let graph = parse_str(json)?;
        let source_key = self.source_key.clone().unwrap_or_default();
        let job_id = self.job_id.clone().unwrap_or_default();
        self.processor().process(&graph, &source_key, &job_id)
    }

    fn processor(self) -> DocumentProcessor {
        let processor = DocumentProcessor::with_options(self.options);
        match self.consolidator {
            Some(consolidator) => processor.with_consolidator(consolidator),
            None => processor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_CELLS: &str = r#"{"Blocks": [
        {"Id": "t1", "BlockType": "TABLE", "Page": 1,
         "Relationships": [{"Type": "CHILD", "Ids": ["c1", "c2"]}]},
        {"Id": "c1", "BlockType": "CELL", "RowIndex": 1, "ColumnIndex": 1,
         "Relationships": [{"Type": "CHILD", "Ids": ["w1"]}]},
        {"Id": "c2", "BlockType": "CELL", "RowIndex": 1, "ColumnIndex": 2,
         "Relationships": [{"Type": "CHILD", "Ids": ["w2"]}]},
        {"Id": "w1", "BlockType": "WORD", "Text": "Name", "Confidence": 99.0},
        {"Id": "w2", "BlockType": "WORD", "Text": "Age", "Confidence": 98.0}
    ]}"#;

    #[test]
    fn test_builder() {
        let builder = OcrTable::new()
            .structural_only()
            .with_line_fallback_header("Lines");

        assert!(!builder.options().prefer_spatial);
        assert_eq!(builder.options().line_fallback_header, "Lines");
    }

    #[test]
    fn test_parse_str() {
        let processed = OcrTable::new()
            .with_job_id("job-1")
            .parse_str(TWO_CELLS)
            .unwrap();
        assert_eq!(processed.rows, vec![vec!["Name", "Age"]]);
        assert_eq!(processed.record.processing_job_id, "job-1");
    }

    #[test]
    fn test_parse_reader() {
        let graph = parse_reader(TWO_CELLS.as_bytes()).unwrap();
        assert_eq!(graph.len(), 5);
    }

    #[test]
    fn test_empty_input_is_error() {
        let result = OcrTable::new().parse_str("[]");
        assert!(matches!(result, Err(Error::EmptyDocument(_))));
    }

    #[test]
    fn test_malformed_input_is_error() {
        assert!(matches!(parse_str("{not json"), Err(Error::Json(_))));
    }
}
