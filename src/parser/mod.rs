//! Block graph parsing: text resolution, table reconstruction and form fields.

mod key_value;
mod options;
mod resolver;
pub mod spatial;
mod structural;

pub use key_value::extract_key_values;
pub use options::{ExtractOptions, SpatialConfig, LINE_FALLBACK_HEADER};
pub use resolver::{resolve_text, ResolvedText, SELECTED_MARKER, UNSELECTED_MARKER};
pub use spatial::{reconstruct_spatial, SpatialFailure, SpatialReconstructor, SpatialWord};
pub use structural::{build_structural, collect_cells};
