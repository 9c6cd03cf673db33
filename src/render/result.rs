//! Processing statistics.

use serde::{Deserialize, Serialize};

use crate::model::{BlockGraph, BlockType, DocumentRecord, TableSet};

/// Statistics collected while processing a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Number of PAGE blocks
    pub page_count: u32,

    /// Number of TABLE blocks found
    pub table_count: u32,

    /// Tables rebuilt from word geometry
    pub spatial_table_count: u32,

    /// Tables rebuilt from declared cells
    pub structural_table_count: u32,

    /// Tables that produced no grid
    pub skipped_table_count: u32,

    /// Number of form fields
    pub key_value_count: u32,

    /// Number of LINE blocks
    pub line_count: u32,

    /// Number of WORD blocks
    pub word_count: u32,
}

impl ExtractionStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect statistics for one processed document.
    pub fn collect(graph: &BlockGraph, set: &TableSet, record: &DocumentRecord) -> Self {
        Self {
            page_count: graph.page_count() as u32,
            table_count: set.tables.len() as u32,
            spatial_table_count: set.spatial_count() as u32,
            structural_table_count: set.structural_count() as u32,
            skipped_table_count: set.skipped_count() as u32,
            key_value_count: record.key_value_pairs.len() as u32,
            line_count: record.raw_lines.len() as u32,
            word_count: graph.of_type(BlockType::Word).count() as u32,
        }
    }

    /// Number of tables that made it into the output.
    pub fn reconstructed_count(&self) -> u32 {
        self.spatial_table_count + self.structural_table_count
    }

    /// Merge another stats instance into this one.
    pub fn merge(&mut self, other: &ExtractionStats) {
        self.page_count += other.page_count;
        self.table_count += other.table_count;
        self.spatial_table_count += other.spatial_table_count;
        self.structural_table_count += other.structural_table_count;
        self.skipped_table_count += other.skipped_table_count;
        self.key_value_count += other.key_value_count;
        self.line_count += other.line_count;
        self.word_count += other.word_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_stats_merge() {
        let mut stats1 = ExtractionStats::new();
        stats1.table_count = 2;
        stats1.spatial_table_count = 1;

        let stats2 = ExtractionStats {
            table_count: 1,
            structural_table_count: 1,
            line_count: 4,
            ..Default::default()
        };

        stats1.merge(&stats2);

        assert_eq!(stats1.table_count, 3);
        assert_eq!(stats1.reconstructed_count(), 2);
        assert_eq!(stats1.line_count, 4);
    }

    #[test]
    fn test_collect_empty() {
        let stats = ExtractionStats::collect(
            &BlockGraph::default(),
            &TableSet::default(),
            &DocumentRecord::new("a", "b"),
        );
        assert_eq!(stats, ExtractionStats::default());
    }
}
