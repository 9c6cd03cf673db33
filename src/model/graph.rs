//! Block graph and identifier index.

use std::collections::HashMap;

use serde::Deserialize;

use super::{Block, BlockType, RelationshipType};
use crate::error::Result;

/// The full set of blocks for one document plus an identifier index.
///
/// Blocks keep their document order. The graph is immutable once built.
#[derive(Debug, Clone, Default)]
pub struct BlockGraph {
    blocks: Vec<Block>,
    index: HashMap<String, usize>,
}

/// Accepted shapes of block JSON input.
#[derive(Deserialize)]
#[serde(untagged)]
enum BlockPayload {
    /// A bare array of blocks
    Blocks(Vec<Block>),
    /// One analysis response page
    Response(ResponsePage),
    /// Several analysis response pages, in fetch order
    Pages(Vec<ResponsePage>),
}

#[derive(Deserialize)]
struct ResponsePage {
    #[serde(rename = "Blocks", default)]
    blocks: Vec<Block>,
}

impl BlockGraph {
    /// Build a graph from blocks in document order.
    ///
    /// When an identifier repeats, the index points at the last occurrence.
    pub fn new(blocks: Vec<Block>) -> Self {
        let index = blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (b.id.clone(), i))
            .collect();
        Self { blocks, index }
    }

    /// Parse block JSON.
    ///
    /// Accepts a bare block array, a single response object with a `Blocks`
    /// member, or an array of such response objects.
    pub fn from_json(json: &str) -> Result<Self> {
        let payload: BlockPayload = serde_json::from_str(json)?;
        let blocks = match payload {
            BlockPayload::Blocks(blocks) => blocks,
            BlockPayload::Response(page) => page.blocks,
            BlockPayload::Pages(pages) => pages.into_iter().flat_map(|p| p.blocks).collect(),
        };
        Ok(Self::new(blocks))
    }

    /// Look up a block by identifier.
    pub fn get(&self, id: &str) -> Option<&Block> {
        self.index.get(id).map(|&i| &self.blocks[i])
    }

    /// All blocks in document order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Blocks of one type, in document order.
    pub fn of_type(&self, block_type: BlockType) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(move |b| b.block_type == block_type)
    }

    /// Resolved targets of a block's relationships of the given kind.
    ///
    /// Dangling identifiers are skipped.
    pub fn related<'a>(
        &'a self,
        block: &'a Block,
        kind: RelationshipType,
    ) -> impl Iterator<Item = &'a Block> + 'a {
        block.related_ids(kind).filter_map(move |id| self.get(id))
    }

    /// Resolved CHILD targets of a block.
    pub fn children<'a>(&'a self, block: &'a Block) -> impl Iterator<Item = &'a Block> + 'a {
        self.related(block, RelationshipType::Child)
    }

    /// Number of PAGE blocks.
    pub fn page_count(&self) -> usize {
        self.of_type(BlockType::Page).count()
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Check if the graph has no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl From<Vec<Block>> for BlockGraph {
    fn from(blocks: Vec<Block>) -> Self {
        Self::new(blocks)
    }
}
