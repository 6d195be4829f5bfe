//! Configuration file management.
//!
//! Handles loading and saving the JSON configuration files. Each file is
//! independently read and written, last-write-wins; a missing file loads
//! as defaults.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::{AccountsConfig, AppError, BackupConfig, ExportConfig, Result, Workspace};

/// Load a JSON config file, or defaults when it does not exist.
///
/// # Errors
/// Returns error if the file exists but cannot be read or parsed.
fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read {}", path.display()), e))?;
    serde_json::from_str(&content).map_err(AppError::json)
}

/// Write a config value as indented UTF-8 JSON.
///
/// # Errors
/// Returns error if serialization or the write fails.
fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    let content = serde_json::to_string_pretty(value).map_err(AppError::json)?;
    fs::write(path, content)
        .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))?;

    tracing::info!(path = %path.display(), "Configuration saved");
    Ok(())
}

/// Load the backup configuration.
pub fn load_backup_config(ws: &Workspace) -> Result<BackupConfig> {
    load_json(&ws.backup_config_path())
}

/// Save the backup configuration.
pub fn save_backup_config(ws: &Workspace, config: &BackupConfig) -> Result<()> {
    save_json(&ws.backup_config_path(), config)
}

/// Load the new-message export configuration.
pub fn load_export_config(ws: &Workspace) -> Result<ExportConfig> {
    load_json(&ws.export_config_path())
}

/// Save the new-message export configuration.
pub fn save_export_config(ws: &Workspace, config: &ExportConfig) -> Result<()> {
    save_json(&ws.export_config_path(), config)
}

/// Load the default-account / known-accounts configuration.
pub fn load_accounts_config(ws: &Workspace) -> Result<AccountsConfig> {
    load_json(&ws.accounts_config_path())
}

/// Save the default-account / known-accounts configuration.
pub fn save_accounts_config(ws: &Workspace, config: &AccountsConfig) -> Result<()> {
    save_json(&ws.accounts_config_path(), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_files_load_defaults() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());

        let backup = load_backup_config(&ws).unwrap();
        assert!(!backup.enable_backup);

        let export = load_export_config(&ws).unwrap();
        assert!(export.enable_export);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());

        let mut config = BackupConfig::default();
        config.enable_backup = true;
        config.backup_path = dir.path().join("backups");
        save_backup_config(&ws, &config).unwrap();

        let loaded = load_backup_config(&ws).unwrap();
        assert!(loaded.enable_backup);
        assert_eq!(loaded.backup_path, dir.path().join("backups"));
    }

    #[test]
    fn test_written_file_is_indented_json() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());

        save_export_config(&ws, &ExportConfig::default()).unwrap();

        let raw = fs::read_to_string(ws.export_config_path()).unwrap();
        assert!(raw.contains("\n  \"enableExport\""));
    }

    #[test]
    fn test_last_write_wins() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());

        let mut config = AccountsConfig::default();
        config.set_default("alice");
        save_accounts_config(&ws, &config).unwrap();
        config.set_default("bob");
        save_accounts_config(&ws, &config).unwrap();

        let loaded = load_accounts_config(&ws).unwrap();
        assert_eq!(loaded.user_config.default_user, "bob");
    }
}
