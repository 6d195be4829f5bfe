//! msgvault - Incremental backup and new-message export for decrypted
//! message stores.
//!
//! The workspace holds one directory per account plus JSON config
//! files; `export` runs the full pipeline (baseline scan, underlying
//! export, incremental backup, per-contact transcripts) and the other
//! subcommands inspect or configure the workspace.

mod application;
mod cli;
mod domain;
mod infrastructure;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDateTime, TimeZone};
use clap::Parser;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{ExportOrchestrator, RunOptions};
use cli::{Cli, Commands, ConfigAction};
use domain::{AppEvent, BackupRun, EventSink, ExportSummary, Workspace};
use infrastructure::{
    load_accounts_config, load_backup_config, load_export_config, refresh_accounts,
    save_accounts_config, save_backup_config, save_export_config, InPlaceExporter,
    MirrorExporter, SqliteMessageStore, StoreExporter,
};
use infrastructure::MessageStore;

fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
fn run(cli: Cli) -> anyhow::Result<()> {
    let workspace = cli
        .root
        .clone()
        .map_or_else(|| Workspace::new(Workspace::default_root()), Workspace::new);

    match cli.command {
        Commands::Export {
            account,
            full,
            source,
        } => cmd_export(&workspace, account, full, source),
        Commands::Accounts => cmd_accounts(&workspace),
        Commands::Contacts { account, limit } => cmd_contacts(&workspace, account, limit),
        Commands::Config { action } => cmd_config(&workspace, action),
        Commands::Paths => cmd_paths(&workspace),
    }
}

/// Pipeline events rendered to the terminal as they arrive.
struct TerminalSink;

impl EventSink for TerminalSink {
    fn emit(&self, event: AppEvent) {
        match &event {
            AppEvent::ExportData(payload) => {
                if payload.contains("\"status\":\"error\"") {
                    eprintln!("  {} {}", "✗".red(), payload);
                } else {
                    println!("  {} {}", "·".dimmed(), payload.dimmed());
                }
            }
            AppEvent::IncrementalBackup(payload) => {
                match serde_json::from_str::<BackupRun>(payload) {
                    Ok(run) => println!(
                        "  {} backup: {} scanned, {} copied ({} bytes) → {}",
                        "✓".green(),
                        run.scanned_total,
                        run.copied_file_count,
                        run.copied_bytes_total,
                        run.destination_root.display()
                    ),
                    Err(_) => println!("  {} backup: {}", "✓".green(), payload),
                }
            }
            AppEvent::NewMessageExport(payload) => {
                match serde_json::from_str::<ExportSummary>(payload) {
                    Ok(summary) => println!(
                        "  {} new messages: {} contacts, {} entries → {}",
                        "✓".green(),
                        summary.contact_total,
                        summary.message_total,
                        summary.output_root.display()
                    ),
                    Err(_) => println!("  {} new messages: {}", "✓".green(), payload),
                }
            }
            AppEvent::RefreshMessageList(_) => {}
        }
    }
}

/// Run the export pipeline for one account.
fn cmd_export(
    workspace: &Workspace,
    account: Option<String>,
    full: bool,
    source: Option<std::path::PathBuf>,
) -> anyhow::Result<()> {
    let account = resolve_account(workspace, account)?;

    let exporter: Box<dyn StoreExporter> = match source {
        Some(live_root) => Box::new(MirrorExporter::new(live_root)),
        None => Box::new(InPlaceExporter),
    };

    println!(
        "{} {} ({})",
        "Exporting".bold(),
        account.cyan(),
        if full { "full" } else { "incremental" }
    );

    let orchestrator =
        ExportOrchestrator::new(workspace.clone(), exporter, Box::new(TerminalSink));
    orchestrator.run_blocking(RunOptions {
        account: account.clone(),
        full,
    })?;

    println!("{} {} exported", "✓".green().bold(), account);
    Ok(())
}

/// List discovered accounts.
fn cmd_accounts(workspace: &Workspace) -> anyhow::Result<()> {
    let mut config = load_accounts_config(workspace)?;
    refresh_accounts(workspace, &mut config)?;
    save_accounts_config(workspace, &config)?;

    if config.user_config.users.is_empty() {
        println!(
            "No accounts under {}",
            workspace.users_dir().display().to_string().cyan()
        );
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Account", "Default"]);
    for account in &config.user_config.users {
        let marker = if *account == config.user_config.default_user {
            "✓"
        } else {
            ""
        };
        table.add_row(vec![account.as_str(), marker]);
    }

    println!("{table}");
    Ok(())
}

/// List an account's contacts.
fn cmd_contacts(
    workspace: &Workspace,
    account: Option<String>,
    limit: usize,
) -> anyhow::Result<()> {
    let account = resolve_account(workspace, account)?;
    let store = SqliteMessageStore::open(&workspace.msg_dir(&account))
        .with_context(|| format!("Cannot open message store for {account}"))?;

    let contacts = store.list_contacts(0, limit)?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["User", "Nickname", "Remark", "Group"]);
    for contact in &contacts {
        table.add_row(vec![
            contact.user_name.as_str(),
            contact.nick_name.as_str(),
            contact.remark.as_str(),
            if contact.is_group { "yes" } else { "" },
        ]);
    }

    println!("{table}");
    println!("Total: {} contact(s)", contacts.len());
    Ok(())
}

/// Show or change the configuration files.
fn cmd_config(workspace: &Workspace, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let backup = load_backup_config(workspace)?;
            let export = load_export_config(workspace)?;
            let accounts = load_accounts_config(workspace)?;

            println!("{}", "Backup".bold());
            println!("{}", serde_json::to_string_pretty(&backup)?);
            println!();
            println!("{}", "Export".bold());
            println!("{}", serde_json::to_string_pretty(&export)?);
            println!();
            println!("{}", "Accounts".bold());
            println!("{}", serde_json::to_string_pretty(&accounts)?);
        }
        ConfigAction::SetBackup {
            enable,
            path,
            max_versions,
        } => {
            let mut config = load_backup_config(workspace)?;
            if let Some(enable) = enable {
                config.enable_backup = enable;
            }
            if let Some(path) = path {
                config.backup_path = path;
            }
            if let Some(max_versions) = max_versions {
                config.max_backup_versions = max_versions;
            }
            save_backup_config(workspace, &config)?;
            println!("{} Backup configuration saved", "✓".green().bold());
        }
        ConfigAction::SetExport {
            enable,
            start_time,
            save_path,
        } => {
            let mut config = load_export_config(workspace)?;
            if let Some(enable) = enable {
                config.enable_export = enable;
            }
            if let Some(start_time) = &start_time {
                config.start_time = parse_local_timestamp(start_time)?;
            }
            if let Some(save_path) = save_path {
                config.save_path = save_path;
            }
            save_export_config(workspace, &config)?;
            println!("{} Export configuration saved", "✓".green().bold());
        }
    }

    Ok(())
}

/// Show workspace paths.
fn cmd_paths(workspace: &Workspace) -> anyhow::Result<()> {
    println!("{}", "Workspace paths".bold());
    println!();
    println!("  [{}] {}", "root".green(), workspace.root().display());
    println!("  [{}] {}", "accounts".blue(), workspace.users_dir().display());
    println!(
        "  [{}] {}",
        "config".blue(),
        workspace.accounts_config_path().display()
    );
    println!(
        "  [{}] {}",
        "config".blue(),
        workspace.backup_config_path().display()
    );
    println!(
        "  [{}] {}",
        "config".blue(),
        workspace.export_config_path().display()
    );
    println!(
        "  [{}] {}",
        "history".blue(),
        workspace.backup_history_path().display()
    );

    Ok(())
}

/// Pick the account to operate on: explicit argument, otherwise the
/// configured default.
fn resolve_account(workspace: &Workspace, account: Option<String>) -> anyhow::Result<String> {
    if let Some(account) = account {
        return Ok(account);
    }

    let mut config = load_accounts_config(workspace)?;
    refresh_accounts(workspace, &mut config)?;
    if config.user_config.default_user.is_empty() {
        bail!(
            "No account specified and none discovered under {}",
            workspace.users_dir().display()
        );
    }
    Ok(config.user_config.default_user)
}

/// Parse a `YYYY-MM-DD HH:MM:SS` local timestamp into unix seconds.
fn parse_local_timestamp(value: &str) -> anyhow::Result<i64> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .with_context(|| format!("Invalid timestamp: {value} (expected YYYY-MM-DD HH:MM:SS)"))?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.timestamp())
        .with_context(|| format!("Ambiguous local timestamp: {value}"))
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
