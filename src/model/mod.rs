//! Model types for OCR block graphs and their derived artifacts.
//!
//! Source blocks come in as a flat list; the [`BlockGraph`] indexes them by
//! identifier. Everything derived from a graph ([`TableGrid`]s, key/value
//! pairs, the [`DocumentRecord`]) is owned by a single processing request.

mod block;
mod graph;
mod record;
mod table;

pub use block::{
    Block, BlockType, BoundingBox, EntityType, Relationship, RelationshipType, SelectionStatus,
};
pub use graph::BlockGraph;
pub use record::{
    CellRecord, DocumentMetadata, DocumentRecord, KeyValuePair, RawLine, RowRecord, TableRecord,
};
pub use table::{
    GridCell, GridRow, NumberedTable, Provenance, SourceCell, SpatialMetrics, TableGrid, TableSet,
};

/// Round a confidence to 2 decimal places.
///
/// Exact ties go to the even neighbour, so `90.125` becomes `90.12`.
pub fn round_confidence(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
