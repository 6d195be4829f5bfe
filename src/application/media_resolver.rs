//! Media reference resolution.
//!
//! Maps a raw, possibly store-relative media reference to a canonical
//! absolute path under the account's media root. Pure path algebra:
//! existence is checked by the caller, never here.

use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// Canonical media-root folder name inside an account directory.
pub const MEDIA_ROOT_NAME: &str = "FileStorage";

/// Media category of a reference being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCategory {
    Image,
    Thumbnail,
    Video,
    Voice,
    File,
    Other,
}

impl MediaCategory {
    /// Fixed category subdirectory under the media root.
    #[must_use]
    pub const fn subdir(self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Thumbnail => "MsgAttach",
            Self::Video => "Video",
            Self::Voice => "Voice",
            Self::File => "File",
            Self::Other => "",
        }
    }
}

/// Resolve `raw` to an absolute path under `account_dir`'s media root.
///
/// Returns `None` for an empty reference. Separators are normalized to
/// the platform separator; a reference that already names the media
/// root, or that already starts with the category subdirectory, is not
/// re-prefixed with the category subdirectory.
#[must_use]
pub fn resolve_media_path(account_dir: &Path, raw: &str, category: MediaCategory) -> Option<PathBuf> {
    if raw.is_empty() {
        return None;
    }

    let sep = MAIN_SEPARATOR;
    let normalized: String = raw.chars().map(|c| if c == '/' || c == '\\' { sep } else { c }).collect();

    let resolved = if normalized
        .split(sep)
        .any(|component| component == MEDIA_ROOT_NAME)
    {
        // Already rooted under the media root folder name.
        join_with_sep(&account_dir.to_string_lossy(), &normalized)
    } else {
        let trimmed = normalized.trim_start_matches(sep);
        let subdir = category.subdir();
        let media_root = join_with_sep(&account_dir.to_string_lossy(), MEDIA_ROOT_NAME);

        if !subdir.is_empty() && starts_with_subdir(trimmed, subdir) {
            join_with_sep(&media_root, trimmed)
        } else if subdir.is_empty() {
            join_with_sep(&media_root, trimmed)
        } else {
            join_with_sep(&join_with_sep(&media_root, subdir), trimmed)
        }
    };

    Some(PathBuf::from(collapse_separators(&resolved)))
}

fn starts_with_subdir(path: &str, subdir: &str) -> bool {
    path.strip_prefix(subdir)
        .is_some_and(|rest| rest.starts_with(MAIN_SEPARATOR))
}

fn join_with_sep(base: &str, rest: &str) -> String {
    let rest = rest.trim_start_matches(MAIN_SEPARATOR);
    format!("{base}{MAIN_SEPARATOR}{rest}")
}

/// Collapse doubled separators left over from concatenation.
fn collapse_separators(path: &str) -> String {
    let sep = MAIN_SEPARATOR;
    let mut out = String::with_capacity(path.len());
    let mut prev_sep = false;
    for c in path.chars() {
        if c == sep {
            if prev_sep {
                continue;
            }
            prev_sep = true;
        } else {
            prev_sep = false;
        }
        out.push(c);
    }
    out
}
