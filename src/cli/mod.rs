//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// msgvault - Incremental backup and new-message export for decrypted
/// message stores.
#[derive(Parser, Debug)]
#[command(name = "msgvault")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Workspace root directory (defaults to ~/.msgvault).
    #[arg(long)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the export pipeline for an account.
    Export {
        /// Account to export (configured default if not specified).
        account: Option<String>,

        /// Full export: skip incremental backup and new-message export.
        #[arg(long)]
        full: bool,

        /// Live source tree to mirror into the workspace before the
        /// backup and export phases. Without it the workspace tree is
        /// used as-is.
        #[arg(long)]
        source: Option<PathBuf>,
    },

    /// List accounts discovered under the workspace.
    Accounts,

    /// List an account's contacts.
    Contacts {
        /// Account to read (configured default if not specified).
        account: Option<String>,

        /// Maximum number of contacts to show.
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show or change configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show the workspace paths being used.
    Paths,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show all configuration files.
    Show,

    /// Change the incremental backup configuration.
    SetBackup {
        /// Enable or disable incremental backup.
        #[arg(long)]
        enable: Option<bool>,

        /// Destination root for versioned backups.
        #[arg(long)]
        path: Option<PathBuf>,

        /// Number of versions the external pruner should retain.
        #[arg(long)]
        max_versions: Option<u32>,
    },

    /// Change the new-message export configuration.
    SetExport {
        /// Enable or disable new-message export.
        #[arg(long)]
        enable: Option<bool>,

        /// Cutoff in local time, `YYYY-MM-DD HH:MM:SS`.
        #[arg(long)]
        start_time: Option<String>,

        /// Directory transcripts are written under (workspace-relative).
        #[arg(long)]
        save_path: Option<PathBuf>,
    },
}
