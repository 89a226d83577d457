//! Filesystem assertions

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every regular file below `root`, sorted
pub fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Read the metadata CSV into (header, rows)
pub fn read_metadata(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).expect("open metadata");
    let header = reader
        .headers()
        .expect("metadata header")
        .iter()
        .map(String::from)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.expect("metadata row").iter().map(String::from).collect())
        .collect();
    (header, rows)
}
