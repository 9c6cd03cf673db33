//! Multi-row header consolidation for structured table records.
//!
//! Some tables carry their column headers across several rows. A
//! [`HeaderConsolidator`] looks at the first rows of a table and proposes a
//! [`ConsolidationPlan`]; [`apply_plan`] rewrites the table accordingly.
//! Consolidation only ever touches the structured record, never the
//! tabular rows.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{CellRecord, RowRecord, TableRecord};

/// Number of leading rows shown to a consolidator.
pub const SAMPLE_ROWS: usize = 10;

/// Confidence assigned to consolidated header cells.
pub const HEADER_CONFIDENCE: f64 = 100.0;

/// Analyzes a table and proposes how to merge its header rows.
pub trait HeaderConsolidator: Send + Sync {
    /// Get the name of this consolidator.
    fn name(&self) -> &str;

    /// Propose a plan for the given table.
    fn analyze(&self, table: &TableRecord) -> Result<ConsolidationPlan>;
}

/// A proposed header layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationPlan {
    /// 0-based rows holding header text
    #[serde(default = "default_header_rows")]
    pub header_row_indices: Vec<usize>,

    /// Final column headers, left to right
    #[serde(default)]
    pub consolidated_headers: Vec<String>,

    /// 0-based row where data begins
    #[serde(default = "default_data_start")]
    pub data_start_row: usize,

    /// Mapping of original columns to new ones, kept as given
    #[serde(default)]
    pub column_mapping: Value,
}

fn default_header_rows() -> Vec<usize> {
    vec![0]
}

fn default_data_start() -> usize {
    1
}

impl Default for ConsolidationPlan {
    fn default() -> Self {
        Self {
            header_row_indices: default_header_rows(),
            consolidated_headers: Vec::new(),
            data_start_row: default_data_start(),
            column_mapping: Value::Null,
        }
    }
}

impl ConsolidationPlan {
    /// Parse a plan from a JSON reply.
    ///
    /// Missing members take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json.trim())
            .map_err(|e| Error::Collaborator(format!("invalid consolidation plan: {}", e)))
    }

    /// Whether the plan can be applied to a table with `row_count` rows.
    pub fn is_applicable(&self, row_count: usize) -> bool {
        !self.consolidated_headers.is_empty() && self.data_start_row < row_count
    }
}

/// Cell texts of the first [`SAMPLE_ROWS`] rows of a table.
pub fn sample_rows(table: &TableRecord) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .take(SAMPLE_ROWS)
        .map(|row| row.cells.iter().map(|c| c.text.clone()).collect())
        .collect()
}

/// The analysis request sent to a text-based consolidator.
pub fn consolidation_prompt(table: &TableRecord) -> Result<String> {
    let sample = serde_json::to_string_pretty(&sample_rows(table))?;
    Ok(format!(
        "Analyze this table structure extracted from a document. The table appears to have \
multi-row headers that need to be consolidated.

Table data (first {} rows):
{}

Please:
1. Identify which rows contain header information
2. Consolidate multi-row headers into a single header row
3. Determine the correct column alignment for data rows
4. Return a JSON response with:
   - \"header_row_indices\": [list of row numbers that contain headers]
   - \"consolidated_headers\": [list of final column headers]
   - \"data_start_row\": index where actual data begins
   - \"column_mapping\": mapping of original columns to new structure

Respond only with valid JSON.",
        SAMPLE_ROWS, sample
    ))
}

/// Rewrite a table according to a plan.
///
/// The new table has one header row followed by the data rows from
/// `data_start_row` on, each cut or padded to the header count. A plan
/// without headers, or one whose data would start past the last row,
/// leaves the table unchanged.
pub fn apply_plan(table: &TableRecord, plan: &ConsolidationPlan) -> TableRecord {
    if !plan.is_applicable(table.rows.len()) {
        log::debug!(
            "Consolidation: plan for table {} not applicable, keeping original",
            table.table_id
        );
        return table.clone();
    }

    let header_count = plan.consolidated_headers.len();
    let mut rows = Vec::with_capacity(table.rows.len() - plan.data_start_row + 1);

    let header_cells = plan
        .consolidated_headers
        .iter()
        .enumerate()
        .map(|(i, text)| CellRecord {
            text: text.clone(),
            confidence: HEADER_CONFIDENCE,
            ..CellRecord::blank(format!("header_{}", i), 1, i + 1)
        })
        .collect();
    rows.push(RowRecord {
        row_index: 1,
        cells: header_cells,
    });

    for (original, row_index) in table.rows[plan.data_start_row..].iter().zip(2usize..) {
        let cells = (0..header_count)
            .map(|col| match original.cells.get(col) {
                Some(cell) => CellRecord {
                    row_index,
                    column_index: col + 1,
                    ..cell.clone()
                },
                None => CellRecord::blank(format!("empty_{}_{}", row_index, col), row_index, col + 1),
            })
            .collect();
        rows.push(RowRecord { row_index, cells });
    }

    log::info!(
        "Consolidation: table {} restructured to {} rows, {} columns",
        table.table_id,
        rows.len(),
        header_count
    );

    TableRecord {
        row_count: rows.len(),
        column_count: header_count,
        rows,
        restructured: true,
        original_row_count: Some(table.rows.len()),
        ai_analysis: serde_json::to_value(plan).ok(),
        ..table.clone()
    }
}

/// Consolidate a table's headers, falling back to the original on any error.
pub fn consolidate(table: &TableRecord, consolidator: &dyn HeaderConsolidator) -> TableRecord {
    match consolidator.analyze(table) {
        Ok(plan) => apply_plan(table, &plan),
        Err(e) => {
            log::warn!(
                "Consolidation: {} failed for table {}: {}",
                consolidator.name(),
                table.table_id,
                e
            );
            table.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPlan(Option<ConsolidationPlan>);

    impl HeaderConsolidator for FixedPlan {
        fn name(&self) -> &str {
            "fixed"
        }

        fn analyze(&self, _table: &TableRecord) -> Result<ConsolidationPlan> {
            self.0
                .clone()
                .ok_or_else(|| Error::Collaborator("no plan".to_string()))
        }
    }

    fn table(rows: &[&[&str]]) -> TableRecord {
        let rows: Vec<RowRecord> = rows
            .iter()
            .enumerate()
            .map(|(r, texts)| RowRecord {
                row_index: r + 1,
                cells: texts
                    .iter()
                    .enumerate()
                    .map(|(c, text)| CellRecord {
                        text: text.to_string(),
                        confidence: 90.0,
                        ..CellRecord::blank(format!("c{}{}", r + 1, c + 1), r + 1, c + 1)
                    })
                    .collect(),
            })
            .collect();
        TableRecord {
            table_id: "t1".to_string(),
            page_number: Some(1),
            confidence: Some(99.0),
            row_count: rows.len(),
            column_count: 3,
            spatially_reconstructed: false,
            rows,
            restructured: false,
            original_row_count: None,
            ai_analysis: None,
        }
    }

    fn plan(headers: &[&str], data_start_row: usize) -> ConsolidationPlan {
        ConsolidationPlan {
            header_row_indices: vec![0, 1],
            consolidated_headers: headers.iter().map(|h| h.to_string()).collect(),
            data_start_row,
            column_mapping: Value::Null,
        }
    }

    #[test]
    fn test_apply_plan() {
        let original = table(&[
            &["Name", "Amount", ""],
            &["", "USD", "EUR"],
            &["Alice", "10"],
            &["Bob", "20", "18", "extra"],
        ]);

        let result = apply_plan(&original, &plan(&["Name", "Amount USD", "Amount EUR"], 2));
        assert!(result.restructured);
        assert_eq!(result.original_row_count, Some(4));
        assert_eq!(result.row_count, 3);
        assert_eq!(result.column_count, 3);
        assert!(result.ai_analysis.is_some());

        let header = &result.rows[0];
        assert_eq!(header.row_index, 1);
        assert_eq!(header.cells[1].cell_id, "header_1");
        assert_eq!(header.cells[1].text, "Amount USD");
        assert_eq!(header.cells[1].confidence, HEADER_CONFIDENCE);

        let alice = &result.rows[1];
        assert_eq!(alice.row_index, 2);
        assert_eq!(alice.cells[0].cell_id, "c31");
        assert_eq!(alice.cells[0].row_index, 2);
        assert_eq!(alice.cells[2].cell_id, "empty_2_2");
        assert_eq!(alice.cells[2].confidence, 0.0);

        let bob = &result.rows[2];
        assert_eq!(bob.cells.len(), 3);
        assert_eq!(bob.cells[2].text, "18");
    }

    #[test]
    fn test_plan_without_headers_keeps_table() {
        let original = table(&[&["a"], &["b"]]);
        assert_eq!(apply_plan(&original, &plan(&[], 1)), original);
    }

    #[test]
    fn test_plan_past_last_row_keeps_table() {
        let original = table(&[&["a"], &["b"]]);
        assert_eq!(apply_plan(&original, &plan(&["A"], 2)), original);
    }

    #[test]
    fn test_consolidate_error_keeps_table() {
        let original = table(&[&["a"], &["b"]]);
        assert_eq!(consolidate(&original, &FixedPlan(None)), original);
    }

    #[test]
    fn test_consolidate_applies_plan() {
        let original = table(&[&["a", "b"], &["1", "2"]]);
        let result = consolidate(&original, &FixedPlan(Some(plan(&["A", "B"], 1))));
        assert_eq!(result.texts(), vec![vec!["A", "B"], vec!["1", "2"]]);
    }

    #[test]
    fn test_plan_defaults() {
        let plan = ConsolidationPlan::from_json(r#"{"consolidated_headers": ["X"]}"#).unwrap();
        assert_eq!(plan.header_row_indices, vec![0]);
        assert_eq!(plan.data_start_row, 1);
        assert!(ConsolidationPlan::from_json("not json").is_err());
    }

    #[test]
    fn test_prompt_samples_first_rows() {
        let rows: Vec<Vec<String>> = (0..15).map(|i| vec![format!("row{}", i)]).collect();
        let refs: Vec<Vec<&str>> = rows.iter().map(|r| r.iter().map(|s| s.as_str()).collect()).collect();
        let slices: Vec<&[&str]> = refs.iter().map(|r| r.as_slice()).collect();
        let original = table(&slices);

        let prompt = consolidation_prompt(&original).unwrap();
        assert!(prompt.contains("row9"));
        assert!(!prompt.contains("row10"));
        assert_eq!(sample_rows(&original).len(), SAMPLE_ROWS);
    }
}
