//! Tabular (CSV) output.

use std::io::Write;

use crate::error::{Error, Result};
use crate::model::{BlockGraph, BlockType, TableSet};
use crate::parser::resolve_text;

/// Assemble the tabular artifact for a document.
///
/// Without any TABLE block the document's LINE blocks are dumped one per
/// row under `line_header`. Otherwise table bodies are concatenated; once
/// any row has been emitted, every later table is preceded by an empty row
/// and a one-cell label row, even if that table produces no rows itself.
pub fn csv_rows(set: &TableSet, graph: &BlockGraph, line_header: &str) -> Vec<Vec<String>> {
    if !set.has_table_blocks() {
        return line_rows(graph, line_header);
    }

    let mut rows: Vec<Vec<String>> = Vec::new();
    for table in &set.tables {
        if !rows.is_empty() {
            rows.push(Vec::new());
            rows.push(vec![table.label()]);
        }
        if let Some(grid) = &table.grid {
            rows.extend(grid.to_rows());
        }
    }
    rows
}

/// One single-cell row per LINE block, under a header row.
///
/// Returns no rows at all when the document has no LINE block.
pub fn line_rows(graph: &BlockGraph, header: &str) -> Vec<Vec<String>> {
    let lines: Vec<Vec<String>> = graph
        .of_type(BlockType::Line)
        .map(|line| vec![resolve_text(line, graph).text])
        .collect();

    if lines.is_empty() {
        return lines;
    }

    let mut rows = Vec::with_capacity(lines.len() + 1);
    rows.push(vec![header.to_string()]);
    rows.extend(lines);
    rows
}

/// Write rows as RFC 4180 CSV with CRLF line endings.
///
/// Rows may differ in length. An empty row is written as a bare line
/// terminator.
pub fn write_csv<W: Write>(rows: &[Vec<String>], mut writer: W) -> Result<()> {
    let mut builder = csv::WriterBuilder::new();
    builder.flexible(true).terminator(csv::Terminator::CRLF);

    // csv writes a zero-field record as `""`, so blank rows bypass it
    let mut segments = rows.split(|row| row.is_empty()).peekable();
    while let Some(segment) = segments.next() {
        {
            let mut wtr = builder.from_writer(&mut writer);
            for row in segment {
                wtr.write_record(row)?;
            }
            wtr.flush()?;
        }
        if segments.peek().is_some() {
            writer.write_all(b"\r\n")?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Render rows to a CSV string.
pub fn to_csv(rows: &[Vec<String>]) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(rows, &mut buf)?;
    String::from_utf8(buf).map_err(|e| Error::Render(format!("CSV is not valid UTF-8: {}", e)))
}
