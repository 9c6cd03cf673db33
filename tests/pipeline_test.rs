//! Integration tests for the full block graph to artifacts pipeline.

use ocrtable::model::BlockGraph;
use ocrtable::parser::extract_key_values;
use ocrtable::{parse_str, process, DocumentProcessor, ExtractOptions, JsonFormat, OcrTable};
use serde_json::{json, Value};

fn word(id: &str, text: &str, confidence: f64) -> Value {
    json!({"Id": id, "BlockType": "WORD", "Text": text, "Confidence": confidence, "Page": 1})
}

fn placed_word(id: &str, text: &str, left: f64, top: f64, width: f64) -> Value {
    json!({
        "Id": id, "BlockType": "WORD", "Text": text, "Confidence": 90.0, "Page": 1,
        "Geometry": {"BoundingBox": {"Left": left, "Top": top, "Width": width, "Height": 0.02}}
    })
}

fn cell(id: &str, row: u32, col: u32, children: &[&str]) -> Value {
    json!({
        "Id": id, "BlockType": "CELL", "RowIndex": row, "ColumnIndex": col,
        "RowSpan": 1, "ColumnSpan": 1, "Confidence": 80.0, "Page": 1,
        "Relationships": [{"Type": "CHILD", "Ids": children}]
    })
}

fn table(id: &str, page: u32, children: &[&str]) -> Value {
    json!({
        "Id": id, "BlockType": "TABLE", "Page": page, "Confidence": 97.5,
        "Relationships": [{"Type": "CHILD", "Ids": children}]
    })
}

fn line(id: &str, children: &[&str]) -> Value {
    json!({
        "Id": id, "BlockType": "LINE", "Page": 1,
        "Relationships": [{"Type": "CHILD", "Ids": children}]
    })
}

fn graph(blocks: Vec<Value>) -> BlockGraph {
    parse_str(&json!({ "Blocks": blocks }).to_string()).unwrap()
}

// ==================== Scenarios ====================

#[test]
fn test_two_cell_table() {
    let graph = graph(vec![
        json!({"Id": "p1", "BlockType": "PAGE"}),
        table("t1", 1, &["c1", "c2"]),
        cell("c1", 1, 1, &["w1"]),
        cell("c2", 1, 2, &["w2"]),
        word("w1", "Name", 99.0),
        word("w2", "Age", 98.0),
    ]);

    let processed = process(&graph, "uploads/a.pdf", "job-a").unwrap();
    assert_eq!(processed.rows, vec![vec!["Name", "Age"]]);

    let table = &processed.record.tables[0];
    assert_eq!(table.row_count, 1);
    assert_eq!(table.column_count, 2);
    assert!(!table.spatially_reconstructed);
    assert_eq!(table.rows[0].cells[0].cell_id, "c1");
    assert_eq!(table.rows[0].cells[1].confidence, 98.0);
}

#[test]
fn test_key_value_pair() {
    let graph = graph(vec![
        json!({
            "Id": "k1", "BlockType": "KEY_VALUE_SET", "EntityTypes": ["KEY"], "Page": 1,
            "Relationships": [
                {"Type": "VALUE", "Ids": ["v1"]},
                {"Type": "CHILD", "Ids": ["kw"]}
            ]
        }),
        json!({
            "Id": "v1", "BlockType": "KEY_VALUE_SET", "EntityTypes": ["VALUE"],
            "Relationships": [{"Type": "CHILD", "Ids": ["vw"]}]
        }),
        word("kw", "Date", 98.0),
        word("vw", "01/01/2024", 95.0),
    ]);

    let processed = process(&graph, "k", "job-b").unwrap();
    let pair = &processed.record.key_value_pairs[0];
    assert_eq!(pair.key, "Date");
    assert_eq!(pair.key_confidence, 98.0);
    assert_eq!(pair.value, "01/01/2024");
    assert_eq!(pair.value_confidence, 95.0);
    assert_eq!(pair.page_number, Some(1));

    // Extracted pairs keep the separator after every value block
    let extracted = extract_key_values(&graph);
    assert_eq!(extracted[0].value, "01/01/2024 ");
}

#[test]
fn test_clean_grid_from_geometry() {
    // Cells carry no declared position, only words with geometry
    let graph = graph(vec![
        table("t1", 1, &["c1", "c2", "c3", "c4"]),
        json!({"Id": "c1", "BlockType": "CELL", "Relationships": [{"Type": "CHILD", "Ids": ["w1"]}]}),
        json!({"Id": "c2", "BlockType": "CELL", "Relationships": [{"Type": "CHILD", "Ids": ["w2"]}]}),
        json!({"Id": "c3", "BlockType": "CELL", "Relationships": [{"Type": "CHILD", "Ids": ["w3"]}]}),
        json!({"Id": "c4", "BlockType": "CELL", "Relationships": [{"Type": "CHILD", "Ids": ["w4"]}]}),
        placed_word("w1", "Item", 0.1, 0.1, 0.3),
        placed_word("w2", "Price", 0.4, 0.1, 0.3),
        placed_word("w3", "Tea", 0.1, 0.3, 0.3),
        placed_word("w4", "2.50", 0.4, 0.3, 0.3),
    ]);

    let processed = process(&graph, "k", "job-c").unwrap();
    assert_eq!(
        processed.rows,
        vec![vec!["Item", "Price"], vec!["Tea", "2.50"]]
    );

    let table = &processed.record.tables[0];
    assert!(table.spatially_reconstructed);
    assert_eq!(table.row_count, 2);
    assert_eq!(table.column_count, 2);
    assert_eq!(table.rows[1].cells[1].cell_id, "spatial_t1_2_2");
    assert_eq!(table.rows[1].cells[1].text, "2.50");
    assert!(table.rows[1].cells[1].geometry.is_none());
}

#[test]
fn test_line_dump_without_tables() {
    let graph = graph(vec![
        line("l1", &["w1"]),
        line("l2", &["w2"]),
        line("l3", &["w3"]),
        word("w1", "Dear customer,", 99.0),
        word("w2", "thank you", 97.0),
        word("w3", "Regards", 96.0),
    ]);

    let processed = process(&graph, "k", "job-d").unwrap();
    assert_eq!(
        processed.rows,
        vec![
            vec!["Detected Lines (No Table Structure Found)"],
            vec!["Dear customer,"],
            vec!["thank you"],
            vec!["Regards"],
        ]
    );
    assert_eq!(processed.record.raw_lines.len(), 3);
    assert_eq!(
        processed.csv().unwrap(),
        "Detected Lines (No Table Structure Found)\r\n\"Dear customer,\"\r\nthank you\r\nRegards\r\n"
    );
}

// ==================== Assembly ====================

#[test]
fn test_tables_separated_in_csv() {
    let graph = graph(vec![
        table("t1", 1, &["a1"]),
        table("t2", 2, &["b1"]),
        cell("a1", 1, 1, &["w1"]),
        cell("b1", 1, 1, &["w2"]),
        word("w1", "first", 90.0),
        word("w2", "second", 90.0),
    ]);

    let processed = process(&graph, "k", "job").unwrap();
    assert_eq!(
        processed.rows,
        vec![
            vec!["first".to_string()],
            vec![],
            vec!["--- Table 2 (Page 2) ---".to_string()],
            vec!["second".to_string()],
        ]
    );
    assert_eq!(
        processed.csv().unwrap(),
        "first\r\n\r\n--- Table 2 (Page 2) ---\r\nsecond\r\n"
    );
}

#[test]
fn test_spanning_cell_and_selection() {
    let graph = graph(vec![
        table("t1", 1, &["h", "x", "y"]),
        json!({
            "Id": "h", "BlockType": "CELL", "RowIndex": 1, "ColumnIndex": 1,
            "RowSpan": 1, "ColumnSpan": 2,
            "Relationships": [{"Type": "CHILD", "Ids": ["hw"]}]
        }),
        cell("x", 2, 1, &["s1"]),
        cell("y", 2, 2, &["yw"]),
        word("hw", "Approved", 99.0),
        json!({"Id": "s1", "BlockType": "SELECTION_ELEMENT", "SelectionStatus": "SELECTED", "Confidence": 88.0}),
        word("yw", "Yes", 97.0),
    ]);

    let processed = process(&graph, "k", "job").unwrap();
    assert_eq!(
        processed.rows,
        vec![vec!["Approved", ""], vec!["[X]", "Yes"]]
    );

    let table = &processed.record.tables[0];
    assert_eq!(table.row_count, 2);
    assert_eq!(table.column_count, 2);
    assert_eq!(table.rows[0].cells.len(), 1);
    assert_eq!(table.rows[0].cells[0].column_span, 2);
}

#[test]
fn test_skipped_table_left_out_of_record() {
    let graph = graph(vec![
        table("t1", 1, &[]),
        line("l1", &["w1"]),
        word("w1", "orphan", 90.0),
    ]);

    let processed = process(&graph, "k", "job").unwrap();
    assert!(processed.rows.is_empty());
    assert!(!processed.has_rows());
    assert!(processed.record.tables.is_empty());
    assert_eq!(processed.stats.skipped_table_count, 1);
    assert_eq!(processed.record.raw_lines[0].text, "orphan");
}

#[test]
fn test_structural_only_option() {
    let blocks = vec![
        table("t1", 1, &["c1", "c2"]),
        cell("c1", 1, 1, &["w1"]),
        cell("c2", 1, 2, &["w2"]),
        placed_word("w1", "left", 0.1, 0.1, 0.2),
        placed_word("w2", "right", 0.6, 0.1, 0.2),
    ];
    let graph = graph(blocks);

    let spatial = process(&graph, "k", "job").unwrap();
    assert!(spatial.record.tables[0].spatially_reconstructed);

    let structural = DocumentProcessor::with_options(ExtractOptions::new().structural_only())
        .process(&graph, "k", "job")
        .unwrap();
    assert!(!structural.record.tables[0].spatially_reconstructed);
    assert_eq!(structural.rows, vec![vec!["left", "right"]]);
}

// ==================== Properties ====================

#[test]
fn test_processing_is_deterministic() {
    let graph = graph(vec![
        table("t1", 1, &["c1", "c2", "c3"]),
        cell("c1", 1, 1, &["w1"]),
        cell("c2", 1, 2, &["w2"]),
        cell("c3", 2, 1, &["w3"]),
        placed_word("w1", "a", 0.10, 0.100, 0.1),
        placed_word("w2", "b", 0.50, 0.104, 0.1),
        placed_word("w3", "c", 0.12, 0.200, 0.1),
    ]);

    let first = process(&graph, "k", "job").unwrap();
    let second = process(&graph, "k", "job").unwrap();
    assert_eq!(first.rows, second.rows);
    assert_eq!(first.record, second.record);
}

#[test]
fn test_input_shapes_equivalent() {
    let blocks = vec![line("l1", &["w1"]), word("w1", "same", 90.0)];
    let bare = parse_str(&Value::Array(blocks.clone()).to_string()).unwrap();
    let response = parse_str(&json!({ "Blocks": blocks }).to_string()).unwrap();
    let pages = parse_str(
        &json!([{ "Blocks": [blocks[0].clone()] }, { "Blocks": [blocks[1].clone()] }]).to_string(),
    )
    .unwrap();

    let expected = process(&bare, "k", "j").unwrap().record;
    assert_eq!(process(&response, "k", "j").unwrap().record, expected);
    assert_eq!(process(&pages, "k", "j").unwrap().record, expected);
}

#[test]
fn test_empty_document_rejected() {
    let result = OcrTable::new().parse_str(r#"{"Blocks": []}"#);
    assert!(matches!(result, Err(ocrtable::Error::EmptyDocument(_))));
}

#[test]
fn test_record_json_shape() {
    let graph = graph(vec![
        json!({"Id": "p1", "BlockType": "PAGE"}),
        table("t1", 1, &["c1"]),
        cell("c1", 1, 1, &["w1"]),
        word("w1", "x", 91.256),
        line("l1", &["w1"]),
    ]);

    let processed = process(&graph, "uploads/x.pdf", "job-x").unwrap();
    let json: Value = serde_json::from_str(&processed.json(JsonFormat::Compact).unwrap()).unwrap();

    assert_eq!(json["originalSourceKey"], "uploads/x.pdf");
    assert_eq!(json["processingJobId"], "job-x");
    assert_eq!(json["documentMetadata"]["pageCount"], 1);
    assert_eq!(json["tables"][0]["tableId"], "t1");
    assert_eq!(json["tables"][0]["pageNumber"], 1);
    assert_eq!(json["tables"][0]["spatiallyReconstructed"], false);
    assert_eq!(json["tables"][0]["rows"][0]["cells"][0]["confidence"], 91.26);
    assert!(json["tables"][0].get("restructured").is_none());
    assert_eq!(json["keyValuePairs"], json!([]));
    assert_eq!(json["rawLines"][0]["lineId"], "l1");
    assert_eq!(json["rawLines"][0]["geometry"], Value::Null);
}
