//! Domain layer - core business logic and types.
//!
//! This layer contains pure domain models and error types
//! without any external dependencies (DB, IO, etc.).

pub mod config;
pub mod dialogue;
pub mod error;
pub mod events;
pub mod message;
pub mod records;

pub use config::{AccountsConfig, BackupConfig, ExportConfig, UserConfig, Workspace};
pub use dialogue::{
    sanitize_file_name, ContactExportResult, DialogueEntry, DialogueTranscript, ExportSummary,
};
pub use error::{AppError, Result};
pub use events::{AppEvent, EventSink};
pub use message::{
    Contact, FileInfo, Message, MessageType, MiscKind, MusicInfo, SelfProfile, SenderIdentity,
};
pub use records::{BackupRun, FileCategory, FileRecord};
