//! Change detection between a fresh scan and prior state.
//!
//! A file is unchanged only when a prior record exists with the same
//! hash and size and both hashes are non-empty. An empty hash means
//! hashing failed at scan time; such files always classify as changed
//! so a failed hash can never mask a real modification.

use crate::domain::FileRecord;

/// Classification outcome for one scanned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Skip: prior record matches by hash and size.
    Unchanged,
    /// Copy: new file, content drift, or an unusable hash.
    Changed,
}

/// Classify a freshly scanned record against the prior record for the
/// same path, if any.
#[must_use]
pub fn classify(new: &FileRecord, prior: Option<&FileRecord>) -> Classification {
    let Some(prior) = prior else {
        return Classification::Changed;
    };

    if !new.has_hash() || !prior.has_hash() {
        // Distinct from a genuine content change, kept observable.
        tracing::warn!(
            path = %new.path.display(),
            "Empty content hash forces a changed classification"
        );
        return Classification::Changed;
    }

    if new.content_hash == prior.content_hash && new.size_bytes == prior.size_bytes {
        Classification::Unchanged
    } else {
        Classification::Changed
    }
}
