//! Reconstructed table grid types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which reconstruction method produced a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Derived from declared row/column indices and spans
    Structural,
    /// Derived from word bounding-box geometry
    Spatial,
}

/// A reconstructed table: rows of equally long cell sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableGrid {
    /// Identifier of the source TABLE block
    pub table_id: String,

    /// Page of the source TABLE block
    pub page: Option<u32>,

    /// Confidence of the source TABLE block
    pub confidence: Option<f64>,

    /// Reconstruction method
    pub provenance: Provenance,

    /// Rows, top to bottom (row N is at index N - 1)
    pub rows: Vec<GridRow>,

    /// Declared cells the grid was built from (structural grids only)
    pub source_cells: Vec<SourceCell>,

    /// Tolerances used to build the grid (spatial grids only)
    pub metrics: Option<SpatialMetrics>,
}

impl TableGrid {
    /// Create an empty grid.
    pub fn new(table_id: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            table_id: table_id.into(),
            page: None,
            confidence: None,
            provenance,
            rows: Vec::new(),
            source_cells: Vec::new(),
            metrics: None,
        }
    }

    /// Add a row to the grid.
    pub fn add_row(&mut self, row: GridRow) {
        self.rows.push(row);
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns (based on first row).
    pub fn column_count(&self) -> usize {
        self.rows.first().map(|r| r.cells.len()).unwrap_or(0)
    }

    /// Check if the grid has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the grid came from geometry.
    pub fn is_spatial(&self) -> bool {
        self.provenance == Provenance::Spatial
    }

    /// Cell texts, row-major.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| r.cells.iter().map(|c| c.text.clone()).collect())
            .collect()
    }
}

/// A grid row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridRow {
    /// Cells, left to right (column N is at index N - 1)
    pub cells: Vec<GridCell>,
}

impl GridRow {
    /// Create a new row with cells.
    pub fn new(cells: Vec<GridCell>) -> Self {
        Self { cells }
    }

    /// Create a row from text values with zero confidence.
    pub fn from_strings<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::new(values.into_iter().map(|v| GridCell::new(v, 0.0)).collect())
    }
}

/// A grid cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridCell {
    /// Cell text (possibly empty)
    pub text: String,

    /// Cell confidence (0-100)
    pub confidence: f64,
}

impl GridCell {
    /// Create a new cell.
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }

    /// Create an empty cell.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if the cell has no text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A TABLE block and its reconstruction outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberedTable {
    /// 1-based position among all TABLE blocks
    pub number: usize,

    /// Identifier of the TABLE block
    pub table_id: String,

    /// Page of the TABLE block
    pub page: Option<u32>,

    /// Reconstructed grid, `None` when the table was skipped
    pub grid: Option<TableGrid>,
}

impl NumberedTable {
    /// Label written ahead of the table in tabular output.
    pub fn label(&self) -> String {
        match self.page {
            Some(page) => format!("--- Table {} (Page {}) ---", self.number, page),
            None => format!("--- Table {} (Page Unknown) ---", self.number),
        }
    }
}

/// Every TABLE block of a document after reconstruction, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSet {
    pub tables: Vec<NumberedTable>,
}

impl TableSet {
    /// Whether the document had any TABLE block at all.
    pub fn has_table_blocks(&self) -> bool {
        !self.tables.is_empty()
    }

    /// Iterate over the reconstructed grids.
    pub fn grids(&self) -> impl Iterator<Item = &TableGrid> {
        self.tables.iter().filter_map(|t| t.grid.as_ref())
    }

    /// Number of tables built from geometry.
    pub fn spatial_count(&self) -> usize {
        self.grids().filter(|g| g.is_spatial()).count()
    }

    /// Number of tables built from declared structure.
    pub fn structural_count(&self) -> usize {
        self.grids().filter(|g| !g.is_spatial()).count()
    }

    /// Number of TABLE blocks that produced no grid.
    pub fn skipped_count(&self) -> usize {
        self.tables.iter().filter(|t| t.grid.is_none()).count()
    }
}

/// A declared CELL block as it was resolved during structural building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCell {
    /// Identifier of the CELL block
    pub cell_id: String,
    /// Declared row (1-based)
    pub row_index: u32,
    /// Declared column (1-based)
    pub column_index: u32,
    /// Declared row span
    pub row_span: u32,
    /// Declared column span
    pub column_span: u32,
    /// Resolved text
    pub text: String,
    /// Resolved confidence
    pub confidence: f64,
    /// Raw geometry of the CELL block
    pub geometry: Option<Value>,
}

/// Data-derived tolerances recorded by spatial reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialMetrics {
    /// Number of words with a valid bounding box
    pub word_count: usize,
    /// Mean word height
    pub mean_word_height: f64,
    /// Row clustering tolerance
    pub row_tolerance: f64,
    /// Horizontal extent of all word edges
    pub doc_width: f64,
    /// Column boundary merge tolerance
    pub boundary_tolerance: f64,
}
