//! Backup-history index.
//!
//! `backup_history.json` is a JSON array of file records maintained by an
//! external writer; this core only reads it for change detection.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppError, FileRecord, Result};

/// Read-only path-keyed index of previously backed-up files.
#[derive(Debug, Default)]
pub struct HistoricalIndex {
    records: HashMap<PathBuf, FileRecord>,
}

impl HistoricalIndex {
    /// Load the index from `backup_history.json`.
    ///
    /// A missing file is an empty index, not an error.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No backup history, starting empty");
            return Ok(Self::default());
        }

        let data = fs::read_to_string(path)
            .map_err(|e| AppError::io(format!("Failed to read {}", path.display()), e))?;
        let records: Vec<FileRecord> = serde_json::from_str(&data).map_err(AppError::json)?;

        Ok(Self {
            records: records.into_iter().map(|r| (r.path.clone(), r)).collect(),
        })
    }

    /// Exact-path lookup; no normalization is applied, so path
    /// representation drift reads as "new".
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.records.get(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let index = HistoricalIndex::load(&dir.path().join("backup_history.json")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_load_and_lookup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backup_history.json");
        fs::write(
            &path,
            r#"[{"path":"/data/User/a/Msg/msg.db","sizeBytes":10,"modifyTimeUnix":5,"contentHash":"ab","category":"database"}]"#,
        )
        .unwrap();

        let index = HistoricalIndex::load(&path).unwrap();
        assert_eq!(index.len(), 1);
        let record = index.get(Path::new("/data/User/a/Msg/msg.db")).unwrap();
        assert_eq!(record.content_hash, "ab");
        assert!(index.get(Path::new("/data/User/a/Msg/other.db")).is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backup_history.json");
        fs::write(&path, "not json").unwrap();
        assert!(HistoricalIndex::load(&path).is_err());
    }
}
