//! Document processing: one block graph in, both artifacts out.
//!
//! [`DocumentProcessor`] reconstructs every table once and derives the
//! tabular rows and the structured record from the same result. Header
//! consolidation is an optional collaborator injected at construction.
//!
//! # Example
//!
//! ```no_run
//! use ocrtable::convert::DocumentProcessor;
//! use ocrtable::model::BlockGraph;
//!
//! fn main() -> ocrtable::Result<()> {
//!     let json = std::fs::read_to_string("blocks.json")?;
//!     let graph = BlockGraph::from_json(&json)?;
//!
//!     let processed = DocumentProcessor::new().process(&graph, "uploads/scan.pdf", "job-1")?;
//!     println!("{}", processed.csv()?);
//!     Ok(())
//! }
//! ```

mod consolidate;
pub mod job;
mod tables;

pub use consolidate::{
    apply_plan, consolidate, consolidation_prompt, sample_rows, ConsolidationPlan,
    HeaderConsolidator, HEADER_CONFIDENCE, SAMPLE_ROWS,
};
pub use tables::{reconstruct_table, reconstruct_tables};

use std::sync::Arc;

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::model::{BlockGraph, DocumentRecord, TableSet};
use crate::parser::{extract_key_values, ExtractOptions};
use crate::render::{csv_rows, document_record, to_csv, to_json, ExtractionStats, JsonFormat};

/// Both artifacts for one document, plus what was learned producing them.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    /// Tabular artifact rows
    pub rows: Vec<Vec<String>>,

    /// Structured artifact
    pub record: DocumentRecord,

    /// Per-table reconstruction outcomes
    pub tables: TableSet,

    /// Extraction statistics
    pub stats: ExtractionStats,
}

impl ProcessedDocument {
    /// Tabular artifact as CSV text.
    pub fn csv(&self) -> Result<String> {
        to_csv(&self.rows)
    }

    /// Structured artifact as JSON text.
    pub fn json(&self, format: JsonFormat) -> Result<String> {
        to_json(&self.record, format)
    }

    /// Whether the tabular artifact has any rows.
    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }
}

/// One document queued for batch processing.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub graph: BlockGraph,
    pub source_key: String,
    pub job_id: String,
}

impl BatchItem {
    /// Create a new batch item.
    pub fn new(graph: BlockGraph, source_key: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            graph,
            source_key: source_key.into(),
            job_id: job_id.into(),
        }
    }
}

/// Converts block graphs into tabular and structured artifacts.
#[derive(Clone, Default)]
pub struct DocumentProcessor {
    options: ExtractOptions,
    consolidator: Option<Arc<dyn HeaderConsolidator>>,
}

impl DocumentProcessor {
    /// Create a processor with default options and no consolidation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a processor with custom options.
    pub fn with_options(options: ExtractOptions) -> Self {
        Self {
            options,
            consolidator: None,
        }
    }

    /// Consolidate table headers in the structured record.
    pub fn with_consolidator(mut self, consolidator: Arc<dyn HeaderConsolidator>) -> Self {
        self.consolidator = Some(consolidator);
        self
    }

    /// Get the extraction options.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Process one document.
    ///
    /// Fails only when the graph has no blocks; per-table problems are
    /// logged and the table is left out.
    pub fn process(
        &self,
        graph: &BlockGraph,
        source_key: &str,
        job_id: &str,
    ) -> Result<ProcessedDocument> {
        if graph.is_empty() {
            return Err(Error::EmptyDocument(job_id.to_string()));
        }

        let tables = reconstruct_tables(graph, &self.options);
        let rows = csv_rows(&tables, graph, &self.options.line_fallback_header);
        let key_values = extract_key_values(graph);
        let mut record = document_record(graph, &tables, &key_values, source_key, job_id);

        if let Some(consolidator) = &self.consolidator {
            record.tables = record
                .tables
                .iter()
                .map(|table| consolidate(table, consolidator.as_ref()))
                .collect();
        }

        let stats = ExtractionStats::collect(graph, &tables, &record);
        log::info!(
            "Processed job {}: {} of {} tables, {} rows, {} form fields, {} lines",
            job_id,
            stats.reconstructed_count(),
            stats.table_count,
            rows.len(),
            stats.key_value_count,
            stats.line_count
        );

        Ok(ProcessedDocument {
            rows,
            record,
            tables,
            stats,
        })
    }

    /// Process independent documents, in input order.
    ///
    /// Runs in parallel when the options allow it. One document failing
    /// does not affect the others.
    pub fn process_batch(&self, items: &[BatchItem]) -> Vec<Result<ProcessedDocument>> {
        let run = |item: &BatchItem| self.process(&item.graph, &item.source_key, &item.job_id);

        if self.options.parallel {
            items.par_iter().map(run).collect()
        } else {
            items.iter().map(run).collect()
        }
    }
}

impl std::fmt::Debug for DocumentProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentProcessor")
            .field("options", &self.options)
            .field(
                "consolidator",
                &self.consolidator.as_ref().map(|c| c.name().to_string()),
            )
            .finish()
    }
}

/// Process independent documents with the given options.
pub fn process_batch(items: &[BatchItem], options: ExtractOptions) -> Vec<Result<ProcessedDocument>> {
    DocumentProcessor::with_options(options).process_batch(items)
}
