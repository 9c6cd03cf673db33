//! Text and confidence resolution for any block.

use crate::model::{Block, BlockGraph, BlockType};

/// Marker written for a checked selection element.
pub const SELECTED_MARKER: &str = "[X]";

/// Marker written for an unchecked selection element.
pub const UNSELECTED_MARKER: &str = "[ ]";

/// Text and aggregated confidence of a block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedText {
    /// Space-joined text, trimmed
    pub text: String,
    /// Minimum confidence of all contributors, 0.0 when nothing contributed
    pub confidence: f64,
}

/// Resolve a block's text from its WORD and SELECTION_ELEMENT children.
///
/// Falls back to the block's own text and confidence when no child
/// contributed. The result is only as confident as its least confident
/// contributor.
pub fn resolve_text(block: &Block, graph: &BlockGraph) -> ResolvedText {
    let mut parts: Vec<&str> = Vec::new();
    let mut confidences: Vec<f64> = Vec::new();

    for child in graph.children(block) {
        match child.block_type {
            BlockType::Word => {
                parts.push(child.text.as_deref().unwrap_or_default());
                confidences.push(child.confidence_or_zero());
            }
            BlockType::SelectionElement => {
                parts.push(if child.is_selected() {
                    SELECTED_MARKER
                } else {
                    UNSELECTED_MARKER
                });
                confidences.push(child.confidence_or_zero());
            }
            _ => {}
        }
    }

    let mut text = parts.join(" ").trim().to_string();

    if text.is_empty() {
        if let Some(own) = block.text.as_deref() {
            text = own.trim().to_string();
            confidences.push(block.confidence_or_zero());
        }
    }

    let confidence = confidences.into_iter().reduce(f64::min).unwrap_or(0.0);

    ResolvedText { text, confidence }
}
