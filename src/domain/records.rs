//! Backup-side domain models.
//!
//! A [`FileRecord`] describes one regular file found by the tree scanner;
//! a [`BackupRun`] aggregates one invocation of the backup pipeline.
//! Field names follow the persisted JSON surface (camelCase).

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Subtree category a scanned file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    /// Decrypted store databases (the `Msg` subtree).
    Database,
    /// Media payloads (the `FileStorage` subtree).
    Media,
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database => write!(f, "database"),
            Self::Media => write!(f, "media"),
        }
    }
}

/// One regular file as seen by the tree scanner.
///
/// Identity is `path` (absolute, OS-native separators). The backup
/// versioner is the only mutator: it sets `backup_destination` and
/// refreshes `size_bytes`/`modify_time_unix` when a copy happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Absolute path of the scanned file.
    pub path: PathBuf,
    /// File size in bytes at scan (or copy) time.
    pub size_bytes: u64,
    /// Modification time as unix seconds.
    pub modify_time_unix: i64,
    /// Hex-encoded content hash; empty when hashing failed.
    #[serde(default)]
    pub content_hash: String,
    /// Which subtree the file was scanned under.
    pub category: FileCategory,
    /// Where the file was copied to, if it was copied this run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_destination: Option<PathBuf>,
}

impl FileRecord {
    /// Whether hashing succeeded for this record.
    #[must_use]
    pub fn has_hash(&self) -> bool {
        !self.content_hash.is_empty()
    }
}

/// Aggregate result of one backup pipeline invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRun {
    /// Number of files seen by the post-export scan.
    pub scanned_total: usize,
    /// Number of files classified as new or changed.
    pub new_file_count: usize,
    /// Number of files actually copied.
    pub copied_file_count: usize,
    /// Sum of sizes of files actually copied.
    pub copied_bytes_total: u64,
    /// Versioned destination directory unique to this run.
    pub destination_root: PathBuf,
    /// Records for every scanned file.
    pub records: Vec<FileRecord>,
}

impl BackupRun {
    /// Build an in-memory index keyed by path, for change detection.
    #[must_use]
    pub fn index(&self) -> HashMap<PathBuf, FileRecord> {
        self.records
            .iter()
            .map(|r| (r.path.clone(), r.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, hash: &str) -> FileRecord {
        FileRecord {
            path: PathBuf::from(path),
            size_bytes: 42,
            modify_time_unix: 1_700_000_000,
            content_hash: hash.to_string(),
            category: FileCategory::Media,
            backup_destination: None,
        }
    }

    #[test]
    fn test_has_hash() {
        assert!(record("/a", "deadbeef").has_hash());
        assert!(!record("/a", "").has_hash());
    }

    #[test]
    fn test_record_json_shape() {
        let json = serde_json::to_value(record("/a/b.jpg", "ff")).unwrap();
        assert_eq!(json["sizeBytes"], 42);
        assert_eq!(json["modifyTimeUnix"], 1_700_000_000);
        assert_eq!(json["contentHash"], "ff");
        assert_eq!(json["category"], "media");
        assert!(json.get("backupDestination").is_none());
    }

    #[test]
    fn test_run_index_keys_by_path() {
        let run = BackupRun {
            scanned_total: 2,
            records: vec![record("/a", "1"), record("/b", "2")],
            ..Default::default()
        };
        let index = run.index();
        assert_eq!(index.len(), 2);
        assert_eq!(index[&PathBuf::from("/b")].content_hash, "2");
    }
}
