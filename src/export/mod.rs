pub mod json;

pub use json::{ImportReport, WordSet, export_json_to_path, import_into, import_json};
