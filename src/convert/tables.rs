//! Per-table reconstruction with fallback.

use std::panic::{self, AssertUnwindSafe};

use crate::model::{Block, BlockGraph, BlockType, NumberedTable, TableGrid, TableSet};
use crate::parser::{build_structural, ExtractOptions, SpatialReconstructor};

/// Reconstruct every TABLE block of a document, in document order.
///
/// Each table is reconstructed once; both output artifacts are built from
/// the same result.
pub fn reconstruct_tables(graph: &BlockGraph, options: &ExtractOptions) -> TableSet {
    let tables = graph
        .of_type(BlockType::Table)
        .enumerate()
        .map(|(i, table)| NumberedTable {
            number: i + 1,
            table_id: table.id.clone(),
            page: table.page,
            grid: reconstruct_table(table, graph, options),
        })
        .collect::<Vec<_>>();

    log::debug!("Found {} table(s)", tables.len());
    TableSet { tables }
}

/// Reconstruct one TABLE block: geometry first, declared structure second.
///
/// Returns `None` when neither method yields a grid. A panic inside either
/// method is contained here and counts as that method failing.
pub fn reconstruct_table(
    table: &Block,
    graph: &BlockGraph,
    options: &ExtractOptions,
) -> Option<TableGrid> {
    if options.prefer_spatial {
        let reconstructor = SpatialReconstructor::with_config(options.spatial);
        let spatial = guarded(&table.id, "spatial", || reconstructor.reconstruct(table, graph));
        if let Some(grid) = spatial {
            log::info!(
                "Table {}: spatial reconstruction, {} x {}",
                table.id,
                grid.row_count(),
                grid.column_count()
            );
            return Some(grid);
        }
        log::info!("Table {}: spatial reconstruction failed, using declared cells", table.id);
    }

    match guarded(&table.id, "structural", || build_structural(table, graph)) {
        Some(grid) => {
            log::info!(
                "Table {}: structural reconstruction, {} x {}",
                table.id,
                grid.row_count(),
                grid.column_count()
            );
            Some(grid)
        }
        None => {
            log::warn!("Table {}: no usable cells, skipping", table.id);
            None
        }
    }
}

fn guarded<F>(table_id: &str, method: &str, f: F) -> Option<TableGrid>
where
    F: FnOnce() -> Option<TableGrid>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(grid) => grid,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::warn!(
                "Table {}: {} reconstruction panicked: {}",
                table_id,
                method,
                message
            );
            None
        }
    }
}
