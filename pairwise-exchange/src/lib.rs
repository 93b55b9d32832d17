//! pairwise-exchange: moving task lists in and out of a session
//! (bulk text files, JSON save files, plain-text reports).

pub mod bulk;
pub mod json;
pub mod text;
pub mod types;

pub use bulk::{read_bulk_file, read_bulk_reader};
pub use json::{apply_import, export_json, import_json, parse_import};
pub use text::export_text;
pub use types::{ExchangePayload, ImportPayload, FORMAT_VERSION};

/// Default file name for plain-text exports.
pub const TEXT_EXPORT_FILE: &str = "prioritized-tasks.txt";
/// Default file name for JSON exports.
pub const JSON_EXPORT_FILE: &str = "task-prioritizer-data.json";
