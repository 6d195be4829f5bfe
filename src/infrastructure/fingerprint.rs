//! Content fingerprinting for scanned files.
//!
//! Streams file bytes through SHA-256 and pairs the digest with basic
//! stat metadata.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};

use crate::domain::{AppError, Result};

/// Size/mtime pair read from a live file.
#[derive(Debug, Clone, Copy)]
pub struct FileStat {
    pub size_bytes: u64,
    pub modify_time_unix: i64,
}

/// Hex-encoded SHA-256 of a file's contents.
///
/// # Errors
/// Returns error if the file cannot be opened or read.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open {}", path.display()), e))?;

    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| AppError::io(format!("Failed to read {}", path.display()), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Read size and modification time from a live file.
///
/// # Errors
/// Returns error if metadata cannot be read.
pub fn stat_file(path: &Path) -> Result<FileStat> {
    let metadata = fs::metadata(path)
        .map_err(|e| AppError::io(format!("Failed to stat {}", path.display()), e))?;

    let modify_time_unix = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs() as i64);

    Ok(FileStat {
        size_bytes: metadata.len(),
        modify_time_unix,
    })
}
