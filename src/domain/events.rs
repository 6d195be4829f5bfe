//! Events emitted by the orchestrator.
//!
//! Fire-and-forget; no acknowledgment is expected. Payloads are already
//! serialized so sinks stay dumb relays.

/// One emitted event with its serialized payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Free-form status strings from the underlying exporter, plus the
    /// terminal `{"status":"completed",...,"progress":100}` message.
    ExportData(String),
    /// Serialized `BackupRun`.
    IncrementalBackup(String),
    /// Serialized `ExportSummary`.
    NewMessageExport(String),
    /// `{"action":"refresh"}`.
    RefreshMessageList(String),
}

impl AppEvent {
    /// Wire name of this event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ExportData(_) => "exportData",
            Self::IncrementalBackup(_) => "incrementalBackup",
            Self::NewMessageExport(_) => "newMessageExport",
            Self::RefreshMessageList(_) => "refreshMessageList",
        }
    }

    /// Serialized payload of this event.
    #[must_use]
    pub fn payload(&self) -> &str {
        match self {
            Self::ExportData(p)
            | Self::IncrementalBackup(p)
            | Self::NewMessageExport(p)
            | Self::RefreshMessageList(p) => p,
        }
    }

    /// The refresh signal sent at run completion.
    #[must_use]
    pub fn refresh() -> Self {
        Self::RefreshMessageList("{\"action\":\"refresh\"}".to_string())
    }
}

/// Destination for emitted events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AppEvent);
}
