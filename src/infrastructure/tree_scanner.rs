//! Directory-tree scanning.
//!
//! Walks a subtree and produces one [`FileRecord`] per regular file.
//! A missing root yields zero records; a file whose hash cannot be
//! computed keeps an empty hash and the scan continues, which the
//! change detector later treats as always-changed.

use std::path::Path;

use walkdir::WalkDir;

use crate::domain::{FileCategory, FileRecord};

use super::fingerprint::{hash_file, stat_file};

/// Scan every regular file under `root`, tagging records with `category`.
#[must_use]
pub fn scan_tree(root: &Path, category: FileCategory) -> Vec<FileRecord> {
    if !root.is_dir() {
        tracing::debug!(root = %root.display(), "Scan root missing, yielding no records");
        return Vec::new();
    }

    let mut records = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let stat = match stat_file(path) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unstatable file");
                continue;
            }
        };

        let content_hash = match hash_file(path) {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Hashing failed, record keeps empty hash");
                String::new()
            }
        };

        records.push(FileRecord {
            path: path.to_path_buf(),
            size_bytes: stat.size_bytes,
            modify_time_unix: stat.modify_time_unix,
            content_hash,
            category,
            backup_destination: None,
        });
    }

    tracing::debug!(
        root = %root.display(),
        category = %category,
        count = records.len(),
        "Scanned subtree"
    );

    records
}
