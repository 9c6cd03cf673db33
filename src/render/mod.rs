//! Rendering module for the tabular and structured artifacts.

mod csv;
mod json;
mod record;
mod result;

pub use self::csv::{csv_rows, line_rows, to_csv, write_csv};
pub use json::{to_json, JsonFormat};
pub use record::{document_record, raw_lines, table_record};
pub use result::ExtractionStats;
