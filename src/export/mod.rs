pub mod json;

pub use json::{Backup, export_json_to_path, import_json};
