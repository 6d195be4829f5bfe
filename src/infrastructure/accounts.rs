//! Account discovery.
//!
//! Accounts are the subdirectories of `<root>/User/`; the configured
//! default is kept only if it still exists on disk.

use std::fs;
use std::path::Path;

use crate::domain::{AccountsConfig, AppError, Result, Workspace};

/// List account directory names under the workspace's `User/` directory.
///
/// A missing `User/` directory yields an empty list.
///
/// # Errors
/// Returns error if the directory exists but cannot be read.
pub fn discover_accounts(ws: &Workspace) -> Result<Vec<String>> {
    let users_dir = ws.users_dir();
    if !users_dir.is_dir() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(&users_dir)
        .map_err(|e| AppError::io(format!("Failed to read {}", users_dir.display()), e))?;

    let mut accounts = Vec::new();
    for entry in entries.filter_map(std::result::Result::ok) {
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            if let Some(name) = entry.file_name().to_str() {
                accounts.push(name.to_string());
            }
        }
    }

    accounts.sort();
    Ok(accounts)
}

/// Refresh the accounts config from what is actually on disk.
///
/// The default account is cleared if it no longer exists and falls back
/// to the first discovered account.
pub fn refresh_accounts(ws: &Workspace, config: &mut AccountsConfig) -> Result<()> {
    let accounts = discover_accounts(ws)?;

    if !accounts.iter().any(|a| *a == config.user_config.default_user) {
        config.user_config.default_user.clear();
    }
    if config.user_config.default_user.is_empty() {
        if let Some(first) = accounts.first() {
            config.user_config.default_user = first.clone();
        }
    }
    config.user_config.users = accounts;
    config.export_path = ws.root().to_path_buf();

    Ok(())
}

/// Whether `account` exists under the workspace.
#[must_use]
pub fn account_exists(ws: &Workspace, account: &str) -> bool {
    !account.is_empty() && account_dir_is_present(&ws.account_dir(account))
}

fn account_dir_is_present(path: &Path) -> bool {
    path.is_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_discover_lists_directories_only() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        fs::create_dir_all(ws.users_dir().join("bob")).unwrap();
        fs::create_dir_all(ws.users_dir().join("alice")).unwrap();
        fs::write(ws.users_dir().join("stray.txt"), b"x").unwrap();

        assert_eq!(discover_accounts(&ws).unwrap(), vec!["alice", "bob"]);
    }

    #[test]
    fn test_missing_users_dir_is_empty() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        assert!(discover_accounts(&ws).unwrap().is_empty());
    }

    #[test]
    fn test_refresh_falls_back_to_first_account() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        fs::create_dir_all(ws.users_dir().join("alice")).unwrap();

        let mut config = AccountsConfig::default();
        config.user_config.default_user = "gone".into();
        refresh_accounts(&ws, &mut config).unwrap();

        assert_eq!(config.user_config.default_user, "alice");
        assert_eq!(config.user_config.users, vec!["alice"]);
    }

    #[test]
    fn test_account_exists() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        fs::create_dir_all(ws.account_dir("alice")).unwrap();

        assert!(account_exists(&ws, "alice"));
        assert!(!account_exists(&ws, "bob"));
        assert!(!account_exists(&ws, ""));
    }
}
