//! Per-contact dialogue reconstruction.
//!
//! Pages a contact's messages backward from the cutoff timestamp,
//! resolves speaker identity and media content, and assembles an
//! ordered transcript. A contact with zero accepted messages yields no
//! transcript, no output file, and no summary entry.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};

use crate::domain::{
    sanitize_file_name, AppError, Contact, ContactExportResult, DialogueEntry, DialogueTranscript,
    Message, MessageType, Result, SelfProfile,
};
use crate::infrastructure::{Direction, MessageStore};

use super::renderer::render_content;

/// Messages fetched per store query.
const PAGE_SIZE: usize = 1000;

/// Reconstructs transcripts for one account's contacts.
pub struct DialogueReconstructor<'a> {
    store: &'a dyn MessageStore,
    account_dir: &'a Path,
    self_profile: &'a SelfProfile,
    cutoff: i64,
}

impl<'a> DialogueReconstructor<'a> {
    #[must_use]
    pub fn new(
        store: &'a dyn MessageStore,
        account_dir: &'a Path,
        self_profile: &'a SelfProfile,
        cutoff: i64,
    ) -> Self {
        Self {
            store,
            account_dir,
            self_profile,
            cutoff,
        }
    }

    /// Build the transcript for one contact, or `None` when no message
    /// is accepted.
    ///
    /// # Errors
    /// Returns error if the store query fails.
    pub fn reconstruct(&self, contact: &Contact) -> Result<Option<DialogueTranscript>> {
        let mut entries = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.store.list_messages_since(
                &contact.user_name,
                self.cutoff,
                PAGE_SIZE,
                offset,
                Direction::Backward,
            )?;
            let page_len = page.len();

            for msg in &page {
                if let Some(entry) = self.accept(contact, msg, entries.len() + 1) {
                    entries.push(entry);
                }
            }

            if page_len < PAGE_SIZE {
                break;
            }
            offset += page_len;
        }

        if entries.is_empty() {
            return Ok(None);
        }

        Ok(Some(DialogueTranscript {
            instruction_label: format!("{} 的新消息对话", contact.nick_name),
            entries,
        }))
    }

    /// Reconstruct and write one contact's transcript file under
    /// `save_dir`.
    ///
    /// # Errors
    /// Returns error if the store query or the file write fails.
    pub fn export_contact(
        &self,
        contact: &Contact,
        save_dir: &Path,
    ) -> Result<Option<ContactExportResult>> {
        let Some(transcript) = self.reconstruct(contact)? else {
            return Ok(None);
        };

        let output_file_path = transcript_path(save_dir, &contact.nick_name);
        let transcripts = vec![transcript];
        write_transcripts(&output_file_path, &transcripts)?;

        let entry_count = transcripts[0].entries.len();
        tracing::info!(
            contact = %contact.nick_name,
            entries = entry_count,
            path = %output_file_path.display(),
            "Exported contact transcript"
        );

        Ok(Some(ContactExportResult {
            contact_display_name: contact.nick_name.clone(),
            entry_count,
            output_file_path,
            transcripts,
        }))
    }

    /// Filter, resolve, and render one message into an entry.
    fn accept(&self, contact: &Contact, msg: &Message, ordinal: usize) -> Option<DialogueEntry> {
        if msg.message_type() == MessageType::System {
            return None;
        }

        // The query excludes these already; guard against an
        // inclusive/exclusive boundary mismatch in the store.
        if msg.create_time < self.cutoff {
            tracing::debug!(
                contact = %contact.nick_name,
                create_time = msg.create_time,
                cutoff = self.cutoff,
                "Dropping pre-cutoff message returned by the store"
            );
            return None;
        }

        let rendered_text = render_content(self.account_dir, msg);
        if rendered_text.is_empty() {
            return None;
        }

        Some(DialogueEntry {
            ordinal,
            speaker_display_name: self.resolve_speaker(contact, msg),
            rendered_text,
            timestamp_display: format_timestamp(msg.create_time),
        })
    }

    /// Resolve who said it, preferring original nicknames over aliases.
    fn resolve_speaker(&self, contact: &Contact, msg: &Message) -> String {
        if msg.is_sender {
            return self.self_profile.nick_name.clone();
        }

        if contact.is_group {
            if msg.sender.is_empty() {
                return contact.nick_name.clone();
            }
            return match self.store.resolve_nickname_cached(&msg.sender.user_name) {
                Ok(nickname) => nickname,
                Err(_) if !msg.sender.nick_name.is_empty() => msg.sender.nick_name.clone(),
                Err(_) => msg.sender.user_name.clone(),
            };
        }

        contact.nick_name.clone()
    }
}

/// Local-time display format for transcript entries.
fn format_timestamp(unix: i64) -> String {
    Local
        .timestamp_opt(unix, 0)
        .single()
        .map_or_else(|| unix.to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn transcript_path(save_dir: &Path, contact_name: &str) -> PathBuf {
    save_dir.join(format!("{}.json", sanitize_file_name(contact_name)))
}

/// The transcript file holds the transcript list, not the full
/// per-contact result wrapper.
fn write_transcripts(path: &Path, transcripts: &[DialogueTranscript]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io(format!("Failed to create {}", parent.display()), e))?;
    }
    let json = serde_json::to_string_pretty(transcripts).map_err(AppError::json)?;
    fs::write(path, json).map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))
}
