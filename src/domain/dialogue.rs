//! Dialogue-side domain models.
//!
//! A [`DialogueTranscript`] is the per-contact unit written to disk; an
//! [`ExportSummary`] aggregates one new-message export run. Serialized
//! field names match the transcript file surface (camelCase).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One accepted message inside a contact's transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueEntry {
    /// 1-based, contact-scoped position; assigned as entries are accepted.
    pub ordinal: usize,
    /// Resolved display name of the speaker.
    pub speaker_display_name: String,
    /// Rendered message content.
    pub rendered_text: String,
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp_display: String,
}

/// The transcript for one contact; never materialized when empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueTranscript {
    /// Human-readable label describing this transcript.
    pub instruction_label: String,
    /// Accepted entries in store-returned order.
    pub entries: Vec<DialogueEntry>,
}

/// Per-contact outcome of a new-message export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactExportResult {
    pub contact_display_name: String,
    pub entry_count: usize,
    pub output_file_path: PathBuf,
    /// Currently always length 1.
    pub transcripts: Vec<DialogueTranscript>,
}

/// Aggregate of one new-message export run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub contact_total: usize,
    pub message_total: usize,
    pub output_root: PathBuf,
    /// Run start, formatted `YYYY-MM-DD_HH-MM-SS`.
    pub exported_at: String,
    pub contacts: Vec<ContactExportResult>,
}

/// Replace characters that are illegal in filenames and cap the length.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    const ILLEGAL: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if out.len() + c.len_utf8() > 100 {
            break;
        }
        out.push(if ILLEGAL.contains(&c) { '_' } else { c });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_illegal_characters() {
        assert_eq!(sanitize_file_name("a/b:c*d"), "a_b_c_d");
        assert_eq!(sanitize_file_name("work group <2024>"), "work group _2024_");
    }

    #[test]
    fn test_sanitize_caps_length_on_char_boundary() {
        let long = "图".repeat(60); // 3 bytes each
        let out = sanitize_file_name(&long);
        assert!(out.len() <= 100);
        assert_eq!(out.chars().count(), 33);
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = DialogueEntry {
            ordinal: 1,
            speaker_display_name: "张三".into(),
            rendered_text: "hello".into(),
            timestamp_display: "2025-10-16 08:00:00".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["ordinal"], 1);
        assert_eq!(json["speakerDisplayName"], "张三");
        assert_eq!(json["renderedText"], "hello");
        assert_eq!(json["timestampDisplay"], "2025-10-16 08:00:00");
    }
}
