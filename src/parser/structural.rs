//! Table reconstruction from declared cell indices and spans.

use std::collections::HashMap;

use crate::model::{
    Block, BlockGraph, BlockType, GridCell, GridRow, Provenance, SourceCell, TableGrid,
};

use super::resolver::resolve_text;

/// Collect the CELL blocks of a table.
///
/// MERGED_CELL children are unwrapped one level into their CELL children.
pub fn collect_cells<'a>(table: &'a Block, graph: &'a BlockGraph) -> Vec<&'a Block> {
    let mut cells = Vec::new();

    for child in graph.children(table) {
        match child.block_type {
            BlockType::Cell => cells.push(child),
            BlockType::MergedCell => cells.extend(
                graph
                    .children(child)
                    .filter(|b| b.block_type == BlockType::Cell),
            ),
            _ => {}
        }
    }

    cells
}

/// Build a grid from the declared structure of a TABLE block.
///
/// Each cell's text lands at the top-left of its span; the other covered
/// positions get empty text. Returns `None` when the table has no usable
/// cells.
pub fn build_structural(table: &Block, graph: &BlockGraph) -> Option<TableGrid> {
    let cells = collect_cells(table, graph);
    if cells.is_empty() {
        log::debug!("Structural: table {} has no cell blocks", table.id);
        return None;
    }

    let mut positions: HashMap<(u32, u32), GridCell> = HashMap::new();
    let mut source_cells = Vec::with_capacity(cells.len());
    let mut max_row = 0;
    let mut max_col = 0;

    for cell in cells {
        let (row, col) = match (cell.row_index, cell.column_index) {
            (Some(r), Some(c)) if r > 0 && c > 0 => (r, c),
            _ => {
                log::debug!("Structural: cell {} has no valid position, skipping", cell.id);
                continue;
            }
        };
        let row_span = cell.row_span();
        let col_span = cell.column_span();
        let resolved = resolve_text(cell, graph);

        for r_offset in 0..row_span {
            for c_offset in 0..col_span {
                let pos = (row + r_offset, col + c_offset);
                if r_offset == 0 && c_offset == 0 {
                    positions.insert(pos, GridCell::new(resolved.text.clone(), resolved.confidence));
                } else {
                    positions.entry(pos).or_insert_with(GridCell::empty);
                }
            }
        }

        max_row = max_row.max(row + row_span - 1);
        max_col = max_col.max(col + col_span - 1);

        source_cells.push(SourceCell {
            cell_id: cell.id.clone(),
            row_index: row,
            column_index: col,
            row_span,
            column_span: col_span,
            text: resolved.text,
            confidence: resolved.confidence,
            geometry: cell.geometry.clone(),
        });
    }

    if positions.is_empty() {
        log::debug!("Structural: no cell data extracted for table {}", table.id);
        return None;
    }

    let mut grid = TableGrid::new(table.id.clone(), Provenance::Structural);
    grid.page = table.page;
    grid.confidence = table.confidence;
    grid.source_cells = source_cells;

    for r in 1..=max_row {
        let cells = (1..=max_col)
            .map(|c| positions.remove(&(r, c)).unwrap_or_default())
            .collect();
        grid.add_row(GridRow::new(cells));
    }

    log::debug!(
        "Structural: table {} built as {} x {}",
        table.id,
        max_row,
        max_col
    );

    Some(grid)
}
