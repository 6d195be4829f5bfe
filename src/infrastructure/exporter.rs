//! Underlying store exporter.
//!
//! The real export (decryption included) is an external collaborator;
//! this module defines its boundary and ships a mirror-based exporter
//! that refreshes the export tree from a source directory, emitting one
//! progress string per file. Progress travels over an SPSC channel the
//! producer closes when done.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use walkdir::WalkDir;

use crate::domain::{AppError, Result};

/// Interface boundary of the underlying exporter.
pub trait StoreExporter: Send + Sync {
    /// Export the account's data into `dest`, reporting progress strings
    /// through `progress`. Dropping the sender signals completion.
    fn export(&self, account: &str, dest: &Path, progress: &Sender<String>) -> Result<()>;
}

/// Exporter that mirrors an already-decrypted source tree into the
/// export destination.
pub struct MirrorExporter {
    source_root: PathBuf,
}

impl MirrorExporter {
    #[must_use]
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
        }
    }
}

impl StoreExporter for MirrorExporter {
    fn export(&self, account: &str, dest: &Path, progress: &Sender<String>) -> Result<()> {
        let source = self.source_root.join(account);
        if !source.is_dir() {
            return Err(AppError::InvalidData {
                message: format!("No source data for account {account}"),
            });
        }

        let _ = progress.send(format!(
            "{{\"status\":\"processing\", \"result\":\"exporting {account}\", \"progress\": 0}}"
        ));

        let mut copied = 0usize;
        for entry in WalkDir::new(&source).into_iter().filter_map(std::result::Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&source)
                .map_err(|_| AppError::PathOutsideRoot {
                    path: entry.path().to_path_buf(),
                    root: source.clone(),
                })?;
            let target = dest.join(relative);

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| AppError::io(format!("Failed to create {}", parent.display()), e))?;
            }
            fs::copy(entry.path(), &target).map_err(|e| {
                AppError::io(
                    format!("Failed to copy {} -> {}", entry.path().display(), target.display()),
                    e,
                )
            })?;

            copied += 1;
            let _ = progress.send(format!(
                "{{\"status\":\"processing\", \"result\":\"{}\", \"progress\": 50}}",
                relative.display()
            ));
        }

        tracing::info!(account, copied, "Mirror export finished");
        Ok(())
    }
}

/// Exporter for account trees that are already in place; reports one
/// status line and leaves the destination untouched.
pub struct InPlaceExporter;

impl StoreExporter for InPlaceExporter {
    fn export(&self, account: &str, dest: &Path, progress: &Sender<String>) -> Result<()> {
        if !dest.is_dir() {
            return Err(AppError::InvalidData {
                message: format!("No exported data for account {account}"),
            });
        }

        let _ = progress.send(format!(
            "{{\"status\":\"processing\", \"result\":\"{account} 数据已就绪\", \"progress\": 50}}"
        ));
        Ok(())
    }
}
