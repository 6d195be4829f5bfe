//! Configuration records and workspace path layout.
//!
//! The three JSON config files (accounts, backup, export) are flat
//! records persisted verbatim, last-write-wins. Serialized field names
//! match the on-disk surface (camelCase).

use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Incremental backup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupConfig {
    pub enable_backup: bool,
    pub backup_path: PathBuf,
    /// Unix seconds of the last completed backup run.
    pub last_backup_time: i64,
    /// Retained for the external pruner; this core never prunes.
    pub max_backup_versions: u32,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enable_backup: false,
            backup_path: PathBuf::new(),
            last_backup_time: 0,
            max_backup_versions: 10,
        }
    }
}

/// New-message export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfig {
    pub enable_export: bool,
    /// Cutoff, unix seconds; only messages at or after it are exported.
    pub start_time: i64,
    pub save_path: PathBuf,
    pub include_media: bool,
    pub group_by_contact: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enable_export: true,
            start_time: default_cutoff(),
            save_path: PathBuf::from("save"),
            include_media: true,
            group_by_contact: true,
        }
    }
}

/// 2025-10-16 00:00:00 local time, matching the shipped default.
fn default_cutoff() -> i64 {
    Local
        .with_ymd_and_hms(2025, 10, 16, 0, 0, 0)
        .single()
        .map_or(0, |dt| dt.timestamp())
}

/// Default-account / known-accounts configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsConfig {
    pub export_path: PathBuf,
    pub user_config: UserConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    pub default_user: String,
    pub users: Vec<String>,
}

impl AccountsConfig {
    /// Register an account and make it the default.
    pub fn set_default(&mut self, account: &str) {
        if !self.user_config.users.iter().any(|u| u == account) {
            self.user_config.users.push(account.to_string());
        }
        self.user_config.default_user = account.to_string();
    }
}

/// Filesystem layout of one workspace root.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default workspace root: `~/.msgvault`.
    #[must_use]
    pub fn default_root() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".msgvault")
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one subdirectory per exported account.
    #[must_use]
    pub fn users_dir(&self) -> PathBuf {
        self.root.join("User")
    }

    #[must_use]
    pub fn account_dir(&self, account: &str) -> PathBuf {
        self.users_dir().join(account)
    }

    /// Decrypted store databases for an account.
    #[must_use]
    pub fn msg_dir(&self, account: &str) -> PathBuf {
        self.account_dir(account).join("Msg")
    }

    /// Media root for an account.
    #[must_use]
    pub fn media_dir(&self, account: &str) -> PathBuf {
        self.account_dir(account).join("FileStorage")
    }

    #[must_use]
    pub fn accounts_config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    #[must_use]
    pub fn backup_config_path(&self) -> PathBuf {
        self.root.join("backup_config.json")
    }

    #[must_use]
    pub fn export_config_path(&self) -> PathBuf {
        self.root.join("export_config.json")
    }

    #[must_use]
    pub fn backup_history_path(&self) -> PathBuf {
        self.root.join("backup_history.json")
    }

    /// Per-run transcript output directory.
    #[must_use]
    pub fn save_dir(&self, save_path: &Path, run_label: &str) -> PathBuf {
        if save_path.is_absolute() {
            save_path.join(run_label)
        } else {
            self.root.join(save_path).join(run_label)
        }
    }
}
