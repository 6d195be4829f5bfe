//! Versioned backup destinations and file copies.
//!
//! Each run gets a unique `backup_root/account/<unix-secs>` directory;
//! relative paths from the source tree are mirrored into it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppError, FileRecord, Result};

use super::fingerprint::stat_file;

/// Allocates one destination directory per run and copies files into it.
pub struct BackupVersioner {
    destination_root: PathBuf,
}

impl BackupVersioner {
    /// Create the run's destination directory (parents included).
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub fn begin_run(backup_root: &Path, account: &str, run_start_unix: i64) -> Result<Self> {
        let destination_root = backup_root.join(account).join(run_start_unix.to_string());
        fs::create_dir_all(&destination_root).map_err(|e| {
            AppError::io(
                format!("Failed to create backup dir {}", destination_root.display()),
                e,
            )
        })?;

        Ok(Self { destination_root })
    }

    #[must_use]
    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    /// Copy one record's file into the run directory, mirroring its path
    /// relative to `source_root`.
    ///
    /// Size and mtime are refreshed from the live file so the persisted
    /// record reflects what was actually copied.
    ///
    /// # Errors
    /// Returns error if the record's path is not under `source_root`, or
    /// if directory creation or the copy itself fails.
    pub fn copy(&self, record: &FileRecord, source_root: &Path) -> Result<FileRecord> {
        let relative = record.path.strip_prefix(source_root).map_err(|_| {
            AppError::PathOutsideRoot {
                path: record.path.clone(),
                root: source_root.to_path_buf(),
            }
        })?;

        let destination = self.destination_root.join(relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::io(format!("Failed to create {}", parent.display()), e)
            })?;
        }

        fs::copy(&record.path, &destination).map_err(|e| {
            AppError::io(
                format!(
                    "Failed to copy {} -> {}",
                    record.path.display(),
                    destination.display()
                ),
                e,
            )
        })?;

        // The file may have changed between scan and copy.
        let stat = stat_file(&record.path)?;

        let mut updated = record.clone();
        updated.size_bytes = stat.size_bytes;
        updated.modify_time_unix = stat.modify_time_unix;
        updated.backup_destination = Some(destination);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FileCategory;
    use tempfile::tempdir;

    fn record_for(path: &Path) -> FileRecord {
        FileRecord {
            path: path.to_path_buf(),
            size_bytes: 0,
            modify_time_unix: 0,
            content_hash: "aa".into(),
            category: FileCategory::Media,
            backup_destination: None,
        }
    }

    #[test]
    fn test_begin_run_creates_versioned_dir() {
        let dir = tempdir().unwrap();
        let versioner =
            BackupVersioner::begin_run(&dir.path().join("backups"), "alice", 1_700_000_000)
                .unwrap();

        let expected = dir.path().join("backups/alice/1700000000");
        assert_eq!(versioner.destination_root(), expected);
        assert!(expected.is_dir());
    }

    #[test]
    fn test_copy_mirrors_relative_path_and_refreshes_stat() {
        let dir = tempdir().unwrap();
        let source_root = dir.path().join("tree");
        fs::create_dir_all(source_root.join("FileStorage/Image")).unwrap();
        let file = source_root.join("FileStorage/Image/x.jpg");
        fs::write(&file, vec![1u8; 300]).unwrap();

        let versioner =
            BackupVersioner::begin_run(&dir.path().join("backups"), "alice", 1).unwrap();
        let updated = versioner.copy(&record_for(&file), &source_root).unwrap();

        let dest = versioner.destination_root().join("FileStorage/Image/x.jpg");
        assert_eq!(updated.backup_destination.as_deref(), Some(dest.as_path()));
        assert_eq!(updated.size_bytes, 300);
        assert_eq!(fs::read(&dest).unwrap(), vec![1u8; 300]);
    }

    #[test]
    fn test_copy_rejects_path_outside_source_root() {
        let dir = tempdir().unwrap();
        let outside = dir.path().join("elsewhere/f");
        fs::create_dir_all(outside.parent().unwrap()).unwrap();
        fs::write(&outside, b"x").unwrap();

        let versioner =
            BackupVersioner::begin_run(&dir.path().join("backups"), "alice", 1).unwrap();
        let err = versioner
            .copy(&record_for(&outside), &dir.path().join("tree"))
            .unwrap_err();

        assert!(matches!(err, AppError::PathOutsideRoot { .. }));
    }
}
