//! Form field (key/value) extraction.

use crate::model::{BlockGraph, BlockType, KeyValuePair, RelationshipType};

use super::resolver::resolve_text;

/// Pair every KEY-tagged KEY_VALUE_SET block with its value text.
///
/// Only the first VALUE relationship of a key is followed. Value blocks are
/// concatenated, each followed by a single space, and the value confidence
/// is the maximum over the value blocks: one readable value block is enough.
pub fn extract_key_values(graph: &BlockGraph) -> Vec<KeyValuePair> {
    let mut pairs = Vec::new();

    for key_block in graph.of_type(BlockType::KeyValueSet).filter(|b| b.is_key()) {
        let key = resolve_text(key_block, graph);

        let mut value = String::new();
        let mut value_confidence = 0.0_f64;

        match key_block
            .relationships
            .iter()
            .find(|r| r.kind == RelationshipType::Value)
        {
            Some(relationship) => {
                for value_block in relationship.ids.iter().filter_map(|id| graph.get(id)) {
                    let resolved = resolve_text(value_block, graph);
                    value.push_str(&resolved.text);
                    value.push(' ');
                    value_confidence = value_confidence.max(resolved.confidence);
                }
            }
            None => log::debug!("KeyValue: key {} has no VALUE relationship", key_block.id),
        }

        pairs.push(KeyValuePair {
            key: key.text,
            key_confidence: key.confidence,
            value,
            value_confidence,
            key_geometry: key_block.geometry.clone(),
            page_number: key_block.page,
        });
    }

    log::debug!("KeyValue: extracted {} pairs", pairs.len());
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, EntityType};

    fn key(id: &str, word: &str) -> Block {
        Block::new(id, BlockType::KeyValueSet)
            .with_entity(EntityType::Key)
            .with_page(1)
            .with_children([word])
    }

    fn value(id: &str, word: &str) -> Block {
        Block::new(id, BlockType::KeyValueSet)
            .with_entity(EntityType::Value)
            .with_children([word])
    }

    #[test]
    fn test_single_value() {
        let graph = BlockGraph::new(vec![
            key("k1", "kw").with_relationship(RelationshipType::Value, ["v1"]),
            value("v1", "vw"),
            Block::word("kw", "Date", 98.0),
            Block::word("vw", "01/01/2024", 95.0),
        ]);

        let pairs = extract_key_values(&graph);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].key, "Date");
        assert_eq!(pairs[0].key_confidence, 98.0);
        assert_eq!(pairs[0].value, "01/01/2024 ");
        assert_eq!(pairs[0].value_confidence, 95.0);
        assert_eq!(pairs[0].page_number, Some(1));
    }

    #[test]
    fn test_value_confidence_is_max() {
        let graph = BlockGraph::new(vec![
            key("k1", "kw").with_relationship(RelationshipType::Value, ["v1", "v2"]),
            value("v1", "a"),
            value("v2", "b"),
            Block::word("kw", "Name", 90.0),
            Block::word("a", "Jane", 60.0),
            Block::word("b", "Doe", 85.0),
        ]);

        let pairs = extract_key_values(&graph);
        assert_eq!(pairs[0].value, "Jane Doe ");
        assert_eq!(pairs[0].value_confidence, 85.0);
    }

    #[test]
    fn test_only_first_value_relationship() {
        let graph = BlockGraph::new(vec![
            key("k1", "kw")
                .with_relationship(RelationshipType::Value, ["v1"])
                .with_relationship(RelationshipType::Value, ["v2"]),
            value("v1", "a"),
            value("v2", "b"),
            Block::word("kw", "Total", 90.0),
            Block::word("a", "10", 70.0),
            Block::word("b", "20", 99.0),
        ]);

        let pairs = extract_key_values(&graph);
        assert_eq!(pairs[0].value, "10 ");
        assert_eq!(pairs[0].value_confidence, 70.0);
    }

    #[test]
    fn test_key_without_value() {
        let graph = BlockGraph::new(vec![key("k1", "kw"), Block::word("kw", "Notes", 90.0)]);

        let pairs = extract_key_values(&graph);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].value, "");
        assert_eq!(pairs[0].value_confidence, 0.0);
    }

    #[test]
    fn test_value_blocks_not_treated_as_keys() {
        let graph = BlockGraph::new(vec![value("v1", "a"), Block::word("a", "x", 90.0)]);
        assert!(extract_key_values(&graph).is_empty());
    }
}
