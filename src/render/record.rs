//! Structured record assembly.

use std::collections::BTreeMap;

use crate::model::{
    round_confidence, BlockGraph, BlockType, CellRecord, DocumentRecord, KeyValuePair, RawLine,
    RowRecord, SourceCell, TableGrid, TableRecord, TableSet,
};
use crate::parser::resolve_text;

/// Assemble the structured record for a document.
///
/// Tables come first in document order, then form fields, then every LINE
/// block. All confidences are rounded to 2 decimals; geometry is copied
/// through untouched.
pub fn document_record(
    graph: &BlockGraph,
    set: &TableSet,
    key_values: &[KeyValuePair],
    source_key: &str,
    job_id: &str,
) -> DocumentRecord {
    let mut record = DocumentRecord::new(source_key, job_id);
    record.document_metadata.page_count = graph.page_count();
    record.tables = set.grids().map(table_record).collect();
    record.key_value_pairs = key_values.iter().map(rounded_pair).collect();
    record.raw_lines = raw_lines(graph);
    record
}

/// Convert a reconstructed grid into its record form.
pub fn table_record(grid: &TableGrid) -> TableRecord {
    let rows = if grid.is_spatial() {
        spatial_rows(grid)
    } else {
        structural_rows(&grid.source_cells)
    };

    TableRecord {
        table_id: grid.table_id.clone(),
        page_number: grid.page,
        confidence: grid.confidence.map(round_confidence),
        row_count: grid.row_count(),
        column_count: grid.column_count(),
        spatially_reconstructed: grid.is_spatial(),
        rows,
        restructured: false,
        original_row_count: None,
        ai_analysis: None,
    }
}

/// Every position of a spatial grid gets a synthetic 1x1 cell.
fn spatial_rows(grid: &TableGrid) -> Vec<RowRecord> {
    grid.rows
        .iter()
        .enumerate()
        .map(|(r, row)| {
            let row_index = r + 1;
            let cells = row
                .cells
                .iter()
                .enumerate()
                .map(|(c, cell)| CellRecord {
                    cell_id: format!("spatial_{}_{}_{}", grid.table_id, row_index, c + 1),
                    row_index,
                    column_index: c + 1,
                    row_span: 1,
                    column_span: 1,
                    text: cell.text.clone(),
                    confidence: round_confidence(cell.confidence),
                    geometry: None,
                    spatially_reconstructed: true,
                })
                .collect();
            RowRecord { row_index, cells }
        })
        .collect()
}

/// Declared cells grouped by row, ordered by position.
///
/// When two cells declare the same position the later one wins.
fn structural_rows(source_cells: &[SourceCell]) -> Vec<RowRecord> {
    let mut by_position: BTreeMap<(u32, u32), &SourceCell> = BTreeMap::new();
    for cell in source_cells {
        by_position.insert((cell.row_index, cell.column_index), cell);
    }

    let mut rows: Vec<RowRecord> = Vec::new();
    for ((row, _), cell) in by_position {
        let row_index = row as usize;
        let record = CellRecord {
            cell_id: cell.cell_id.clone(),
            row_index,
            column_index: cell.column_index as usize,
            row_span: cell.row_span,
            column_span: cell.column_span,
            text: cell.text.clone(),
            confidence: round_confidence(cell.confidence),
            geometry: cell.geometry.clone(),
            spatially_reconstructed: false,
        };

        match rows.last_mut() {
            Some(last) if last.row_index == row_index => last.cells.push(record),
            _ => rows.push(RowRecord {
                row_index,
                cells: vec![record],
            }),
        }
    }
    rows
}

/// Record form of a pair: trimmed text, rounded confidences.
fn rounded_pair(pair: &KeyValuePair) -> KeyValuePair {
    KeyValuePair {
        key: pair.key.trim().to_string(),
        value: pair.value.trim().to_string(),
        key_confidence: round_confidence(pair.key_confidence),
        value_confidence: round_confidence(pair.value_confidence),
        ..pair.clone()
    }
}

/// Every LINE block, resolved, in document order.
pub fn raw_lines(graph: &BlockGraph) -> Vec<RawLine> {
    graph
        .of_type(BlockType::Line)
        .map(|line| {
            let resolved = resolve_text(line, graph);
            RawLine {
                line_id: line.id.clone(),
                text: resolved.text,
                confidence: round_confidence(resolved.confidence),
                geometry: line.geometry.clone(),
                page_number: line.page,
            }
        })
        .collect()
}
