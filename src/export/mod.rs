pub mod json;

pub use json::{CardBackup, export_backup_to_path, import_backup};
