//! Table reconstruction from word bounding-box geometry.
//!
//! Rows are found by a greedy single pass over words sorted top to bottom;
//! columns by folding every word's left and right edge into a list of
//! boundaries. Both tolerances are derived from the words themselves so the
//! same code handles small print and large print alike.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::model::{
    round_confidence, Block, BlockGraph, BlockType, GridCell, GridRow, Provenance,
    SpatialMetrics, TableGrid,
};

use super::options::SpatialConfig;

/// A WORD block projected onto page geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialWord {
    /// Identifier of the WORD block
    pub id: String,
    /// Identifier of the CELL the word was reached through
    pub cell_id: String,
    pub text: String,
    pub confidence: f64,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub right: f64,
    pub bottom: f64,
    pub center_x: f64,
    pub center_y: f64,
}

impl SpatialWord {
    /// Project a WORD block, or `None` if its bounding box is missing or invalid.
    pub fn from_block(word: &Block, cell_id: &str) -> Option<Self> {
        let bbox = word.bounding_box()?;
        Some(Self {
            id: word.id.clone(),
            cell_id: cell_id.to_string(),
            text: word.text.clone().unwrap_or_default(),
            confidence: word.confidence_or_zero(),
            left: bbox.left,
            top: bbox.top,
            width: bbox.width,
            height: bbox.height,
            right: bbox.right(),
            bottom: bbox.bottom(),
            center_x: bbox.center_x(),
            center_y: bbox.center_y(),
        })
    }
}

/// A horizontal span between two adjacent column boundaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnRange {
    pub start: f64,
    pub end: f64,
    pub center: f64,
}

impl ColumnRange {
    fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            center: (start + end) / 2.0,
        }
    }

    fn contains(&self, x: f64) -> bool {
        self.start <= x && x <= self.end
    }

    fn distance(&self, x: f64) -> f64 {
        (x - self.start).abs().min((x - self.end).abs())
    }
}

/// Why spatial reconstruction gave up on a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialFailure {
    /// No word reachable from the table's cells had a valid bounding box
    NoWords,
    /// Row clustering produced nothing
    NoRows,
    /// Fewer column boundaries than needed to form a column
    TooFewBoundaries(usize),
}

impl fmt::Display for SpatialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpatialFailure::NoWords => write!(f, "no words with valid geometry"),
            SpatialFailure::NoRows => write!(f, "no rows formed"),
            SpatialFailure::TooFewBoundaries(n) => {
                write!(f, "insufficient column boundaries ({})", n)
            }
        }
    }
}

/// Reconstructs table grids from word geometry.
#[derive(Debug, Clone, Default)]
pub struct SpatialReconstructor {
    config: SpatialConfig,
}

impl SpatialReconstructor {
    /// Create a reconstructor with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reconstructor with custom configuration.
    pub fn with_config(config: SpatialConfig) -> Self {
        Self { config }
    }

    /// Reconstruct a TABLE block, or `None` if geometry is insufficient.
    pub fn reconstruct(&self, table: &Block, graph: &BlockGraph) -> Option<TableGrid> {
        match self.try_reconstruct(table, graph) {
            Ok(grid) => Some(grid),
            Err(reason) => {
                log::debug!("Spatial: table {} not reconstructed: {}", table.id, reason);
                None
            }
        }
    }

    /// Reconstruct a TABLE block, reporting why it failed.
    pub fn try_reconstruct(
        &self,
        table: &Block,
        graph: &BlockGraph,
    ) -> Result<TableGrid, SpatialFailure> {
        log::debug!("Spatial: starting reconstruction for table {}", table.id);

        // Step 1: Project every reachable word with usable geometry
        let mut words = collect_words(table, graph);
        if words.is_empty() {
            return Err(SpatialFailure::NoWords);
        }

        // Step 2: Cluster into rows, top to bottom
        words.sort_by(|a, b| a.top.total_cmp(&b.top));
        let mean_height = words.iter().map(|w| w.height).sum::<f64>() / words.len() as f64;
        let row_tolerance = self.config.row_tolerance(mean_height);
        log::debug!(
            "Spatial: {} words, row tolerance {:.4} (mean height {:.4})",
            words.len(),
            row_tolerance,
            mean_height
        );

        let mut rows = cluster_rows(&words, row_tolerance);
        if rows.is_empty() {
            return Err(SpatialFailure::NoRows);
        }
        for row in &mut rows {
            row.sort_by(|a, b| a.left.total_cmp(&b.left));
        }
        log::debug!("Spatial: grouped words into {} rows", rows.len());

        // Step 3: Fold word edges into column boundaries
        let edges = sorted_edges(&words);
        let doc_width = match (edges.first(), edges.last()) {
            (Some(min), Some(max)) => max - min,
            _ => 1.0,
        };
        let boundary_tolerance = self.config.boundary_tolerance(doc_width);
        let boundaries = fold_boundaries(&edges, boundary_tolerance);
        log::debug!(
            "Spatial: {} column boundaries, tolerance {:.4} (width {:.4})",
            boundaries.len(),
            boundary_tolerance,
            doc_width
        );

        if boundaries.len() < self.config.min_boundaries.max(2) {
            return Err(SpatialFailure::TooFewBoundaries(boundaries.len()));
        }

        let ranges: Vec<ColumnRange> = boundaries
            .windows(2)
            .map(|pair| ColumnRange::new(pair[0], pair[1]))
            .collect();

        // Step 4: Fill the grid row by row
        let mut grid = TableGrid::new(table.id.clone(), Provenance::Spatial);
        grid.page = table.page;
        grid.confidence = table.confidence;
        grid.metrics = Some(SpatialMetrics {
            word_count: words.len(),
            mean_word_height: mean_height,
            row_tolerance,
            doc_width,
            boundary_tolerance,
        });

        for row in &rows {
            grid.add_row(build_row(row, &ranges));
        }

        log::debug!(
            "Spatial: table {} reconstructed as {} x {}",
            table.id,
            grid.row_count(),
            ranges.len()
        );

        Ok(grid)
    }
}

/// Reconstruct a TABLE block from geometry with the given configuration.
pub fn reconstruct_spatial(
    table: &Block,
    graph: &BlockGraph,
    config: &SpatialConfig,
) -> Option<TableGrid> {
    SpatialReconstructor::with_config(*config).reconstruct(table, graph)
}

/// Collect the table's words with valid bounding boxes.
///
/// Walks each CELL child of the table with an explicit stack, descending
/// through LINE blocks at any depth. Document order within a cell is kept.
pub fn collect_words(table: &Block, graph: &BlockGraph) -> Vec<SpatialWord> {
    let mut words = Vec::new();

    for cell in graph.children(table).filter(|b| b.block_type == BlockType::Cell) {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&Block> = graph.children(cell).collect();
        stack.reverse();

        while let Some(block) = stack.pop() {
            match block.block_type {
                BlockType::Word => match SpatialWord::from_block(block, &cell.id) {
                    Some(word) => words.push(word),
                    None => log::debug!("Spatial: invalid bounding box for word {}", block.id),
                },
                BlockType::Line => {
                    if visited.insert(block.id.as_str()) {
                        let start = stack.len();
                        stack.extend(graph.children(block));
                        stack[start..].reverse();
                    }
                }
                _ => {}
            }
        }
    }

    words
}

/// Greedy single-pass row clustering.
///
/// Words must be sorted by top edge. A word joins the open row when its
/// vertical center is within `tolerance` of that row's mean center;
/// otherwise the open row is closed. Closed rows are never revisited.
pub fn cluster_rows(words: &[SpatialWord], tolerance: f64) -> Vec<Vec<&SpatialWord>> {
    let mut rows: Vec<Vec<&SpatialWord>> = Vec::new();
    let mut current: Vec<&SpatialWord> = Vec::new();
    let mut center_sum = 0.0;

    for word in words {
        if !current.is_empty() {
            let mean_center = center_sum / current.len() as f64;
            if (word.center_y - mean_center).abs() > tolerance {
                rows.push(std::mem::take(&mut current));
                center_sum = 0.0;
            }
        }
        center_sum += word.center_y;
        current.push(word);
    }

    if !current.is_empty() {
        rows.push(current);
    }

    rows
}

/// Every word's left and right edge, deduplicated and sorted ascending.
pub fn sorted_edges(words: &[SpatialWord]) -> Vec<f64> {
    let mut edges: Vec<f64> = words.iter().flat_map(|w| [w.left, w.right]).collect();
    edges.sort_by(f64::total_cmp);
    edges.dedup();
    edges
}

/// Fold sorted edges into column boundaries.
///
/// Each edge is compared against the accepted boundaries in insertion
/// order. The first boundary within `tolerance` is replaced by the mean of
/// itself and the edge, and later edges compare against the shifted value,
/// so the result depends on edge order and boundaries can drift. Edges
/// outside every tolerance become new boundaries.
pub fn fold_boundaries(edges: &[f64], tolerance: f64) -> Vec<f64> {
    let mut boundaries = edges.iter().fold(Vec::<f64>::new(), |mut acc, &edge| {
        match acc.iter_mut().find(|b| (edge - **b).abs() <= tolerance) {
            Some(boundary) => *boundary = (*boundary + edge) / 2.0,
            None => acc.push(edge),
        }
        acc
    });
    boundaries.sort_by(f64::total_cmp);
    boundaries
}

/// Column for a word: the first range containing its center, else the
/// range with the nearest edge.
pub fn assign_column(center_x: f64, ranges: &[ColumnRange]) -> usize {
    if let Some(i) = ranges.iter().position(|r| r.contains(center_x)) {
        return i;
    }

    let mut closest = 0;
    let mut min_distance = f64::INFINITY;
    for (i, range) in ranges.iter().enumerate() {
        let distance = range.distance(center_x);
        if distance < min_distance {
            min_distance = distance;
            closest = i;
        }
    }
    closest
}

fn build_row(words: &[&SpatialWord], ranges: &[ColumnRange]) -> GridRow {
    let mut by_column: BTreeMap<usize, Vec<&SpatialWord>> = BTreeMap::new();
    for &word in words {
        by_column
            .entry(assign_column(word.center_x, ranges))
            .or_default()
            .push(word);
    }

    let mut cells = vec![GridCell::empty(); ranges.len()];
    for (column, mut group) in by_column {
        group.sort_by(|a, b| a.left.total_cmp(&b.left));
        let text = group
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let mean = group.iter().map(|w| w.confidence).sum::<f64>() / group.len() as f64;
        cells[column] = GridCell::new(text.trim(), round_confidence(mean));
    }

    GridRow::new(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_word(id: &str, text: &str, left: f64, top: f64) -> SpatialWord {
        let block = Block::word(id, text, 90.0).with_bounding_box(left, top, 0.1, 0.02);
        SpatialWord::from_block(&block, "c").unwrap()
    }

    #[test]
    fn test_cluster_rows() {
        let words = vec![
            make_word("a", "A1", 0.1, 0.100),
            make_word("b", "B1", 0.5, 0.102),
            make_word("c", "A2", 0.1, 0.200),
            make_word("d", "B2", 0.5, 0.201),
        ];

        let rows = cluster_rows(&words, 0.01);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[1][0].text, "A2");
    }

    #[test]
    fn test_cluster_rows_compares_open_row_only() {
        // "c" is farther than the tolerance from "a" but still joins: it is
        // only compared against the open row's mean, which has moved down.
        let words = vec![
            make_word("a", "a", 0.1, 0.100),
            make_word("b", "b", 0.2, 0.106),
            make_word("c", "c", 0.3, 0.112),
            make_word("d", "d", 0.4, 0.140),
        ];

        let rows = cluster_rows(&words, 0.01);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[1][0].text, "d");
    }

    #[test]
    fn test_fold_boundaries_drift() {
        // 0.10 and 0.11 merge to 0.105; 0.12 is out of reach of 0.10 but
        // within tolerance of the shifted boundary, so it merges too.
        let boundaries = fold_boundaries(&[0.10, 0.11, 0.12, 0.50], 0.016);
        assert_eq!(boundaries.len(), 2);
        assert!((boundaries[0] - 0.1125).abs() < 1e-12);
        assert_eq!(boundaries[1], 0.50);
    }

    #[test]
    fn test_fold_boundaries_keeps_distant_edges() {
        let boundaries = fold_boundaries(&[0.1, 0.3, 0.5], 0.01);
        assert_eq!(boundaries, vec![0.1, 0.3, 0.5]);
    }

    #[test]
    fn test_sorted_edges_dedup() {
        let words = vec![
            make_word("a", "x", 0.1, 0.1),
            make_word("b", "y", 0.1, 0.2),
        ];
        let edges = sorted_edges(&words);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0], 0.1);
    }

    #[test]
    fn test_assign_column() {
        let ranges = vec![ColumnRange::new(0.1, 0.4), ColumnRange::new(0.4, 0.8)];

        assert_eq!(assign_column(0.2, &ranges), 0);
        // Shared boundary belongs to the first range containing it
        assert_eq!(assign_column(0.4, &ranges), 0);
        assert_eq!(assign_column(0.6, &ranges), 1);
        // Outside every range: nearest edge wins
        assert_eq!(assign_column(0.05, &ranges), 0);
        assert_eq!(assign_column(0.95, &ranges), 1);
    }

    #[test]
    fn test_build_row_mean_confidence() {
        let mut first = make_word("a", "New", 0.10, 0.1);
        first.confidence = 90.0;
        let mut second = make_word("b", "York", 0.15, 0.1);
        second.confidence = 84.333;
        let ranges = vec![ColumnRange::new(0.0, 0.5), ColumnRange::new(0.5, 1.0)];

        let row = build_row(&[&second, &first], &ranges);
        assert_eq!(row.cells.len(), 2);
        assert_eq!(row.cells[0].text, "New York");
        assert_eq!(row.cells[0].confidence, 87.17);
        assert_eq!(row.cells[1], GridCell::empty());
    }

    #[test]
    fn test_collect_words_through_lines() {
        let table = Block::new("t", BlockType::Table).with_children(["c1"]);
        let graph = BlockGraph::new(vec![
            table.clone(),
            Block::cell("c1", 1, 1).with_children(["l1", "w3"]),
            Block::new("l1", BlockType::Line).with_children(["w1", "l2"]),
            Block::new("l2", BlockType::Line).with_children(["w2", "l1"]),
            Block::word("w1", "one", 90.0).with_bounding_box(0.1, 0.1, 0.05, 0.01),
            Block::word("w2", "two", 90.0).with_bounding_box(0.2, 0.1, 0.05, 0.01),
            Block::word("w3", "three", 90.0).with_bounding_box(0.3, 0.1, 0.05, 0.01),
        ]);

        let words = collect_words(&table, &graph);
        let texts: Vec<_> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert!(words.iter().all(|w| w.cell_id == "c1"));
    }

    #[test]
    fn test_collect_words_skips_invalid_geometry() {
        let table = Block::new("t", BlockType::Table).with_children(["c1"]);
        let graph = BlockGraph::new(vec![
            table.clone(),
            Block::cell("c1", 1, 1).with_children(["w1", "w2"]),
            Block::word("w1", "nogeo", 90.0),
            Block::word("w2", "bad", 90.0).with_geometry(serde_json::json!({
                "BoundingBox": {"Left": null, "Top": 0.1, "Width": 0.1, "Height": 0.1}
            })),
        ]);

        assert!(collect_words(&table, &graph).is_empty());
        assert_eq!(
            SpatialReconstructor::new().try_reconstruct(&table, &graph),
            Err(SpatialFailure::NoWords)
        );
    }

    #[test]
    fn test_single_word_needs_two_boundaries() {
        let table = Block::new("t", BlockType::Table).with_children(["c1"]);
        // Zero-width word: left and right edge coincide
        let graph = BlockGraph::new(vec![
            table.clone(),
            Block::cell("c1", 1, 1).with_children(["w1"]),
            Block::word("w1", "dot", 90.0).with_bounding_box(0.5, 0.5, 0.0, 0.01),
        ]);

        assert_eq!(
            SpatialReconstructor::new().try_reconstruct(&table, &graph),
            Err(SpatialFailure::TooFewBoundaries(1))
        );
    }
}
