//! Source block types, as emitted by the document-analysis service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of node in the block graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    /// A page of the document
    Page,
    /// A line of text
    Line,
    /// A single recognized word
    Word,
    /// A detected table
    Table,
    /// A table cell with declared row/column position
    Cell,
    /// A group of cells merged into one visual cell
    MergedCell,
    /// A form field (key or value side)
    KeyValueSet,
    /// A checkbox or radio button
    SelectionElement,
    /// Any block type this crate does not interpret
    #[serde(other)]
    Other,
}

/// Kind of edge between two blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    /// Parent to child containment
    Child,
    /// Key to value link on a form field
    Value,
    /// Any relationship this crate does not interpret
    #[serde(other)]
    Other,
}

/// Entity tag carried by key/value blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// The key side of a form field
    Key,
    /// The value side of a form field
    Value,
    /// Any entity tag this crate does not interpret
    #[serde(other)]
    Other,
}

/// State of a selection element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionStatus {
    /// Checked
    Selected,
    /// Unchecked
    NotSelected,
    /// Any status this crate does not interpret
    #[serde(other)]
    Other,
}

/// A typed edge to a list of block identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Relationship {
    /// Relationship kind
    #[serde(rename = "Type")]
    pub kind: RelationshipType,

    /// Target block identifiers
    #[serde(default)]
    pub ids: Vec<String>,
}

impl Relationship {
    /// Create a new relationship.
    pub fn new<S: Into<String>>(kind: RelationshipType, ids: impl IntoIterator<Item = S>) -> Self {
        Self {
            kind,
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// A node in the block graph.
///
/// Geometry is kept as raw JSON so that it can be passed through to the
/// structured record verbatim; [`Block::bounding_box`] validates it on
/// demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    /// Unique block identifier
    pub id: String,

    /// Block kind
    pub block_type: BlockType,

    /// Recognized text (words, lines)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Recognition confidence (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Page number (1-indexed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Raw geometry (bounding box and polygon)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,

    /// Outgoing edges
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,

    /// Cell row (1-based)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<u32>,

    /// Cell column (1-based)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_index: Option<u32>,

    /// Number of rows the cell covers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_span: Option<u32>,

    /// Number of columns the cell covers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_span: Option<u32>,

    /// Entity tags (key/value blocks)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_types: Vec<EntityType>,

    /// Selection state (selection elements)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_status: Option<SelectionStatus>,
}

impl Block {
    /// Create a bare block of the given type.
    pub fn new(id: impl Into<String>, block_type: BlockType) -> Self {
        Self {
            id: id.into(),
            block_type,
            text: None,
            confidence: None,
            page: None,
            geometry: None,
            relationships: Vec::new(),
            row_index: None,
            column_index: None,
            row_span: None,
            column_span: None,
            entity_types: Vec::new(),
            selection_status: None,
        }
    }

    /// Create a WORD block with text and confidence.
    pub fn word(id: impl Into<String>, text: impl Into<String>, confidence: f64) -> Self {
        Self::new(id, BlockType::Word)
            .with_text(text)
            .with_confidence(confidence)
    }

    /// Create a CELL block at the given 1-based position.
    pub fn cell(id: impl Into<String>, row: u32, column: u32) -> Self {
        let mut block = Self::new(id, BlockType::Cell);
        block.row_index = Some(row);
        block.column_index = Some(column);
        block
    }

    /// Set text and return self.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set confidence and return self.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Set page number and return self.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set cell spans and return self.
    pub fn with_span(mut self, rows: u32, columns: u32) -> Self {
        self.row_span = Some(rows);
        self.column_span = Some(columns);
        self
    }

    /// Add a relationship and return self.
    pub fn with_relationship<S: Into<String>>(
        mut self,
        kind: RelationshipType,
        ids: impl IntoIterator<Item = S>,
    ) -> Self {
        self.relationships.push(Relationship::new(kind, ids));
        self
    }

    /// Add a CHILD relationship and return self.
    pub fn with_children<S: Into<String>>(self, ids: impl IntoIterator<Item = S>) -> Self {
        self.with_relationship(RelationshipType::Child, ids)
    }

    /// Add an entity tag and return self.
    pub fn with_entity(mut self, entity: EntityType) -> Self {
        self.entity_types.push(entity);
        self
    }

    /// Set selection status and return self.
    pub fn with_selection(mut self, status: SelectionStatus) -> Self {
        self.selection_status = Some(status);
        self
    }

    /// Set a bounding box (fractional page coordinates) and return self.
    pub fn with_bounding_box(mut self, left: f64, top: f64, width: f64, height: f64) -> Self {
        self.geometry = Some(serde_json::json!({
            "BoundingBox": {
                "Left": left,
                "Top": top,
                "Width": width,
                "Height": height,
            }
        }));
        self
    }

    /// Set raw geometry and return self.
    pub fn with_geometry(mut self, geometry: Value) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Confidence, treating a missing value as zero.
    pub fn confidence_or_zero(&self) -> f64 {
        self.confidence.unwrap_or(0.0)
    }

    /// Declared row span (defaults to 1).
    pub fn row_span(&self) -> u32 {
        self.row_span.unwrap_or(1).max(1)
    }

    /// Declared column span (defaults to 1).
    pub fn column_span(&self) -> u32 {
        self.column_span.unwrap_or(1).max(1)
    }

    /// Whether this block carries the KEY entity tag.
    pub fn is_key(&self) -> bool {
        self.entity_types.contains(&EntityType::Key)
    }

    /// Whether this selection element is checked.
    pub fn is_selected(&self) -> bool {
        self.selection_status == Some(SelectionStatus::Selected)
    }

    /// Identifiers referenced by all relationships of the given kind.
    pub fn related_ids(&self, kind: RelationshipType) -> impl Iterator<Item = &str> {
        self.relationships
            .iter()
            .filter(move |r| r.kind == kind)
            .flat_map(|r| r.ids.iter().map(String::as_str))
    }

    /// Identifiers referenced by CHILD relationships.
    pub fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.related_ids(RelationshipType::Child)
    }

    /// Validated bounding box, if the geometry carries one with numeric
    /// left/top/width/height.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_geometry(self.geometry.as_ref()?)
    }
}

/// An axis-aligned box in fractional page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoundingBox {
    /// Left edge
    pub left: f64,
    /// Top edge
    pub top: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Read the `BoundingBox` member of a raw geometry value.
    ///
    /// Returns `None` when the member is absent or any coordinate is not a
    /// finite number.
    pub fn from_geometry(geometry: &Value) -> Option<Self> {
        let bbox = geometry.get("BoundingBox")?;
        let field = |name: &str| bbox.get(name).and_then(Value::as_f64).filter(|v| v.is_finite());
        Some(Self {
            left: field("Left")?,
            top: field("Top")?,
            width: field("Width")?,
            height: field("Height")?,
        })
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Horizontal center.
    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    /// Vertical center.
    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }
}
