//! Run orchestration.
//!
//! Sequences one account run: baseline scan, underlying export with
//! live progress relay, incremental backup, new-message export, then
//! the terminal events. Phases 2-4 execute on one background thread per
//! run; the store handle is opened inside the export phase and dropped
//! with it, so no handle outlives a run.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use chrono::Local;

use crate::domain::{
    AppError, AppEvent, BackupConfig, BackupRun, EventSink, ExportConfig, ExportSummary,
    FileCategory, FileRecord, Result, Workspace,
};
use crate::infrastructure::{
    account_exists, load_accounts_config, load_backup_config, load_export_config,
    refresh_accounts, save_accounts_config, save_backup_config, scan_tree, BackupVersioner,
    HistoricalIndex, MessageStore, SqliteMessageStore, StoreExporter,
};

use super::change_detector::{classify, Classification};
use super::reconstructor::DialogueReconstructor;

/// Contacts fetched per store query.
const CONTACT_PAGE_SIZE: usize = 100;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    ScanningBaseline,
    RunningUnderlyingExport,
    BackingUp,
    ExportingNewMessages,
    Completed,
    Failed,
}

impl RunPhase {
    /// Whether a run is currently in flight.
    #[must_use]
    pub const fn in_flight(self) -> bool {
        matches!(
            self,
            Self::ScanningBaseline
                | Self::RunningUnderlyingExport
                | Self::BackingUp
                | Self::ExportingNewMessages
        )
    }
}

/// Parameters for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub account: String,
    /// Full export: skips the baseline, backup, and new-message phases.
    pub full: bool,
}

/// Coordinates one account run end to end.
pub struct ExportOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    workspace: Workspace,
    exporter: Box<dyn StoreExporter>,
    sink: Box<dyn EventSink>,
    phase: Mutex<RunPhase>,
}

impl ExportOrchestrator {
    #[must_use]
    pub fn new(
        workspace: Workspace,
        exporter: Box<dyn StoreExporter>,
        sink: Box<dyn EventSink>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                workspace,
                exporter,
                sink,
                phase: Mutex::new(RunPhase::Idle),
            }),
        }
    }

    /// Current phase of the most recent run.
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.inner
            .phase
            .lock()
            .map_or(RunPhase::Failed, |p| *p)
    }

    /// Start a run on a background thread.
    ///
    /// # Errors
    /// Returns error if a run is already in flight or the account does
    /// not exist under the workspace.
    pub fn start(&self, options: RunOptions) -> Result<JoinHandle<()>> {
        {
            let mut phase = self
                .inner
                .phase
                .lock()
                .map_err(|_| AppError::RunInProgress)?;
            if phase.in_flight() {
                return Err(AppError::RunInProgress);
            }

            if !account_exists(&self.inner.workspace, &options.account) {
                *phase = RunPhase::Failed;
                drop(phase);
                self.inner.sink.emit(AppEvent::ExportData(
                    serde_json::json!({
                        "status": "error",
                        "result": format!("未找到账号: {}", options.account),
                        "progress": 0,
                    })
                    .to_string(),
                ));
                return Err(AppError::AccountNotFound {
                    name: options.account,
                });
            }

            *phase = RunPhase::ScanningBaseline;
        }

        let inner = Arc::clone(&self.inner);
        Ok(thread::spawn(move || inner.execute(&options)))
    }

    /// Start a run and wait for it to finish.
    ///
    /// # Errors
    /// Same as [`Self::start`], plus an error if the run thread panics.
    pub fn run_blocking(&self, options: RunOptions) -> Result<()> {
        self.start(options)?
            .join()
            .map_err(|_| AppError::InvalidData {
                message: "Run thread panicked".to_string(),
            })
    }
}

impl Inner {
    fn set_phase(&self, next: RunPhase) {
        if let Ok(mut phase) = self.phase.lock() {
            *phase = next;
        }
        tracing::debug!(phase = ?next, "Run phase");
    }

    fn execute(&self, options: &RunOptions) {
        let run_start = Local::now();
        let run_start_unix = run_start.timestamp();
        let run_label = run_start.format("%Y-%m-%d_%H-%M-%S").to_string();

        let backup_config = self.load_or_default(load_backup_config, "backup");
        let export_config = self.load_or_default(load_export_config, "export");

        let incremental_backup = !options.full && backup_config.enable_backup;

        // Phase 1: pre-export snapshot of both subtrees.
        let baseline = if incremental_backup {
            self.set_phase(RunPhase::ScanningBaseline);
            let records = self.scan_account(&options.account);
            let snapshot = BackupRun {
                scanned_total: records.len(),
                records,
                ..BackupRun::default()
            };
            Some(snapshot.index())
        } else {
            None
        };

        // Phase 2: underlying export, progress relayed until the
        // producer closes the channel.
        self.set_phase(RunPhase::RunningUnderlyingExport);
        self.run_underlying_export(&options.account);

        // Phase 3: incremental backup of what the export changed.
        if incremental_backup {
            self.set_phase(RunPhase::BackingUp);
            if let Some(baseline) = &baseline {
                self.run_backup(&options.account, baseline, run_start_unix, &backup_config);
            }
        }

        // Phase 4: per-contact new-message transcripts.
        if !options.full && export_config.enable_export {
            self.set_phase(RunPhase::ExportingNewMessages);
            self.run_new_message_export(&options.account, &export_config, &run_label);
        }

        self.finish(options);
    }

    fn load_or_default<T: Default>(
        &self,
        load: fn(&Workspace) -> Result<T>,
        what: &str,
    ) -> T {
        match load(&self.workspace) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(config = what, error = %e, "Config unreadable, using defaults");
                T::default()
            }
        }
    }

    /// Walk both account subtrees.
    fn scan_account(&self, account: &str) -> Vec<FileRecord> {
        let mut records = scan_tree(&self.workspace.msg_dir(account), FileCategory::Database);
        records.extend(scan_tree(
            &self.workspace.media_dir(account),
            FileCategory::Media,
        ));
        records
    }

    fn run_underlying_export(&self, account: &str) {
        let dest = self.workspace.account_dir(account);
        let (tx, rx) = mpsc::channel::<String>();

        let outcome = thread::scope(|scope| {
            let producer = scope.spawn(move || self.exporter.export(account, &dest, &tx));

            for line in rx {
                self.sink.emit(AppEvent::ExportData(line));
            }

            producer.join()
        });

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(account, error = %e, "Underlying export failed");
                self.sink.emit(AppEvent::ExportData(
                    serde_json::json!({
                        "status": "error",
                        "result": e.to_string(),
                        "progress": 0,
                    })
                    .to_string(),
                ));
            }
            Err(_) => tracing::error!(account, "Underlying exporter panicked"),
        }
    }

    /// Rescan, classify against the baseline then the persisted
    /// history, and copy what changed. Copy errors skip that one file.
    fn run_backup(
        &self,
        account: &str,
        baseline: &HashMap<PathBuf, FileRecord>,
        run_start_unix: i64,
        config: &BackupConfig,
    ) {
        let history = match HistoricalIndex::load(&self.workspace.backup_history_path()) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(error = %e, "Backup history unreadable, treating as empty");
                HistoricalIndex::default()
            }
        };

        let versioner =
            match BackupVersioner::begin_run(&config.backup_path, account, run_start_unix) {
                Ok(v) => v,
                Err(e) => {
                    tracing::error!(account, error = %e, "Cannot create backup destination, skipping backup");
                    return;
                }
            };

        let account_dir = self.workspace.account_dir(account);
        let scanned = self.scan_account(account);

        let mut run = BackupRun {
            scanned_total: scanned.len(),
            destination_root: versioner.destination_root().to_path_buf(),
            ..BackupRun::default()
        };

        for record in scanned {
            let prior = baseline.get(&record.path).or_else(|| history.get(&record.path));
            if classify(&record, prior) == Classification::Unchanged {
                run.records.push(record);
                continue;
            }

            run.new_file_count += 1;
            match versioner.copy(&record, &account_dir) {
                Ok(copied) => {
                    run.copied_file_count += 1;
                    run.copied_bytes_total += copied.size_bytes;
                    run.records.push(copied);
                }
                Err(e) => {
                    tracing::warn!(path = %record.path.display(), error = %e, "Copy failed, skipping file");
                    run.records.push(record);
                }
            }
        }

        tracing::info!(
            account,
            scanned = run.scanned_total,
            copied = run.copied_file_count,
            bytes = run.copied_bytes_total,
            "Backup phase finished"
        );

        match serde_json::to_string(&run) {
            Ok(payload) => self.sink.emit(AppEvent::IncrementalBackup(payload)),
            Err(e) => tracing::error!(error = %e, "Backup run not serializable"),
        }

        let mut updated = config.clone();
        updated.last_backup_time = run_start_unix;
        if let Err(e) = save_backup_config(&self.workspace, &updated) {
            tracing::warn!(error = %e, "Failed to persist lastBackupTime");
        }
    }

    fn run_new_message_export(&self, account: &str, config: &ExportConfig, run_label: &str) {
        let summary = match self.export_new_messages(account, config, run_label) {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(account, error = %e, "New-message export failed, skipping phase");
                return;
            }
        };

        tracing::info!(
            account,
            contacts = summary.contact_total,
            messages = summary.message_total,
            "New-message export finished"
        );

        match serde_json::to_string(&summary) {
            Ok(payload) => self.sink.emit(AppEvent::NewMessageExport(payload)),
            Err(e) => tracing::error!(error = %e, "Export summary not serializable"),
        }
    }

    /// The store handle lives only inside this function.
    fn export_new_messages(
        &self,
        account: &str,
        config: &ExportConfig,
        run_label: &str,
    ) -> Result<ExportSummary> {
        let store = SqliteMessageStore::open(&self.workspace.msg_dir(account))?;
        let profile = store.self_profile()?;
        let account_dir = self.workspace.account_dir(account);
        let save_dir = self.workspace.save_dir(&config.save_path, run_label);

        let reconstructor =
            DialogueReconstructor::new(&store, &account_dir, &profile, config.start_time);

        let mut summary = ExportSummary {
            output_root: save_dir.clone(),
            exported_at: run_label.to_string(),
            ..ExportSummary::default()
        };

        let mut page = 0;
        loop {
            let contacts = store.list_contacts(page, CONTACT_PAGE_SIZE)?;
            let page_len = contacts.len();

            for contact in &contacts {
                match reconstructor.export_contact(contact, &save_dir) {
                    Ok(Some(result)) => {
                        summary.message_total += result.entry_count;
                        summary.contacts.push(result);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            contact = %contact.nick_name,
                            error = %e,
                            "Contact export failed, skipping contact"
                        );
                    }
                }
            }

            if page_len < CONTACT_PAGE_SIZE {
                break;
            }
            page += 1;
        }

        summary.contact_total = summary.contacts.len();
        Ok(summary)
    }

    /// Terminal events plus the refreshed accounts config.
    fn finish(&self, options: &RunOptions) {
        self.sink.emit(AppEvent::ExportData(
            serde_json::json!({
                "status": "completed",
                "result": format!("{} 数据导出完成", options.account),
                "progress": 100,
            })
            .to_string(),
        ));
        self.sink.emit(AppEvent::refresh());

        match load_accounts_config(&self.workspace) {
            Ok(mut accounts) => {
                if let Err(e) = refresh_accounts(&self.workspace, &mut accounts)
                    .and_then(|()| save_accounts_config(&self.workspace, &accounts))
                {
                    tracing::warn!(error = %e, "Failed to persist accounts config");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Accounts config unreadable, not persisted"),
        }

        self.set_phase(RunPhase::Completed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::message_store::testutil::*;
    use crate::infrastructure::{ChannelSink, MirrorExporter};
    use std::fs;
    use std::path::Path;
    use std::sync::mpsc::{Receiver, Sender};
    use tempfile::tempdir;

    fn seed_live_store(live_root: &Path, account: &str) {
        let conn = create_store(&live_root.join(account).join("Msg"));
        insert_profile(&conn, "wxid_self", "Me");
        insert_contact(&conn, "wxid_a", "Alice", false);
        insert_text_message(&conn, "wxid_a", 100, false, "hello");
        insert_text_message(&conn, "wxid_a", 200, true, "hi");

        let media = live_root.join(account).join("FileStorage/Image");
        fs::create_dir_all(&media).unwrap();
        fs::write(media.join("a.jpg"), vec![7u8; 64]).unwrap();
    }

    fn orchestrator_for(
        root: &Path,
        live_root: &Path,
    ) -> (ExportOrchestrator, Receiver<AppEvent>) {
        let (tx, rx) = mpsc::channel();
        let orchestrator = ExportOrchestrator::new(
            Workspace::new(root),
            Box::new(MirrorExporter::new(live_root)),
            Box::new(ChannelSink::new(tx)),
        );
        (orchestrator, rx)
    }

    fn events_by_name(rx: &Receiver<AppEvent>, name: &str) -> Vec<AppEvent> {
        rx.try_iter().filter(|e| e.name() == name).collect()
    }

    #[test]
    fn test_unknown_account_fails_before_spawning() {
        let dir = tempdir().unwrap();
        let (orchestrator, rx) = orchestrator_for(dir.path(), dir.path());

        let err = orchestrator
            .start(RunOptions {
                account: "ghost".into(),
                full: false,
            })
            .unwrap_err();

        assert!(matches!(err, AppError::AccountNotFound { .. }));
        assert_eq!(orchestrator.phase(), RunPhase::Failed);

        let events: Vec<AppEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert!(events[0].payload().contains("\"status\":\"error\""));
    }

    #[test]
    fn test_incremental_run_backs_up_and_exports_transcripts() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("workspace");
        let live = dir.path().join("live");
        seed_live_store(&live, "alice");

        let ws = Workspace::new(&root);
        fs::create_dir_all(ws.account_dir("alice")).unwrap();

        let mut backup = BackupConfig::default();
        backup.enable_backup = true;
        backup.backup_path = dir.path().join("backups");
        crate::infrastructure::save_backup_config(&ws, &backup).unwrap();

        let mut export = ExportConfig::default();
        export.start_time = 150;
        crate::infrastructure::save_export_config(&ws, &export).unwrap();

        let (orchestrator, rx) = orchestrator_for(&root, &live);
        orchestrator
            .run_blocking(RunOptions {
                account: "alice".into(),
                full: false,
            })
            .unwrap();
        assert_eq!(orchestrator.phase(), RunPhase::Completed);

        let events: Vec<AppEvent> = rx.try_iter().collect();

        let backup_events: Vec<&AppEvent> = events
            .iter()
            .filter(|e| e.name() == "incrementalBackup")
            .collect();
        assert_eq!(backup_events.len(), 1);
        let run: BackupRun = serde_json::from_str(backup_events[0].payload()).unwrap();
        // Everything the export brought in is new relative to the empty baseline.
        assert_eq!(run.scanned_total, 2);
        assert_eq!(run.copied_file_count, 2);
        assert!(run.copied_file_count <= run.scanned_total);
        assert!(run.destination_root.starts_with(dir.path().join("backups/alice")));

        let export_events: Vec<&AppEvent> = events
            .iter()
            .filter(|e| e.name() == "newMessageExport")
            .collect();
        assert_eq!(export_events.len(), 1);
        let summary: ExportSummary = serde_json::from_str(export_events[0].payload()).unwrap();
        // Only the message at or after the cutoff survives.
        assert_eq!(summary.contact_total, 1);
        assert_eq!(summary.message_total, 1);
        assert!(summary.contacts[0].output_file_path.is_file());

        let terminal = events.last().unwrap();
        assert_eq!(terminal.name(), "refreshMessageList");
        assert!(events
            .iter()
            .any(|e| e.name() == "exportData" && e.payload().contains("\"progress\":100")));

        // The completed run persisted the discovered account.
        let accounts = crate::infrastructure::load_accounts_config(&ws).unwrap();
        assert_eq!(accounts.user_config.default_user, "alice");

        // lastBackupTime was stamped.
        let saved = crate::infrastructure::load_backup_config(&ws).unwrap();
        assert!(saved.last_backup_time > 0);
    }

    #[test]
    fn test_second_run_on_unchanged_tree_copies_nothing() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("workspace");
        let live = dir.path().join("live");
        seed_live_store(&live, "alice");

        let ws = Workspace::new(&root);
        fs::create_dir_all(ws.account_dir("alice")).unwrap();

        let mut backup = BackupConfig::default();
        backup.enable_backup = true;
        backup.backup_path = dir.path().join("backups");
        crate::infrastructure::save_backup_config(&ws, &backup).unwrap();

        let (orchestrator, rx) = orchestrator_for(&root, &live);
        let options = RunOptions {
            account: "alice".into(),
            full: false,
        };
        orchestrator.run_blocking(options.clone()).unwrap();
        let first: BackupRun =
            serde_json::from_str(events_by_name(&rx, "incrementalBackup")[0].payload()).unwrap();
        assert!(first.copied_file_count > 0);

        orchestrator.run_blocking(options).unwrap();
        let second: BackupRun =
            serde_json::from_str(events_by_name(&rx, "incrementalBackup")[0].payload()).unwrap();
        assert_eq!(second.copied_file_count, 0);
        assert_eq!(second.copied_bytes_total, 0);
        assert_eq!(second.scanned_total, first.scanned_total);
    }

    #[test]
    fn test_full_run_skips_backup_and_new_message_phases() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("workspace");
        let live = dir.path().join("live");
        seed_live_store(&live, "alice");

        let ws = Workspace::new(&root);
        fs::create_dir_all(ws.account_dir("alice")).unwrap();

        let mut backup = BackupConfig::default();
        backup.enable_backup = true;
        backup.backup_path = dir.path().join("backups");
        crate::infrastructure::save_backup_config(&ws, &backup).unwrap();

        let (orchestrator, rx) = orchestrator_for(&root, &live);
        orchestrator
            .run_blocking(RunOptions {
                account: "alice".into(),
                full: true,
            })
            .unwrap();

        let events: Vec<AppEvent> = rx.try_iter().collect();
        assert!(events.iter().all(|e| e.name() != "incrementalBackup"));
        assert!(events.iter().all(|e| e.name() != "newMessageExport"));
        assert!(events.iter().any(|e| e.name() == "refreshMessageList"));
    }

    struct GatedExporter {
        gate: Mutex<Receiver<()>>,
    }

    impl StoreExporter for GatedExporter {
        fn export(&self, _account: &str, _dest: &Path, _progress: &Sender<String>) -> Result<()> {
            if let Ok(gate) = self.gate.lock() {
                let _ = gate.recv();
            }
            Ok(())
        }
    }

    #[test]
    fn test_concurrent_start_is_rejected() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        fs::create_dir_all(ws.account_dir("alice")).unwrap();

        let (release_tx, release_rx) = mpsc::channel();
        let (event_tx, _event_rx) = mpsc::channel();
        let orchestrator = ExportOrchestrator::new(
            ws,
            Box::new(GatedExporter {
                gate: Mutex::new(release_rx),
            }),
            Box::new(ChannelSink::new(event_tx)),
        );

        let options = RunOptions {
            account: "alice".into(),
            full: true,
        };
        let handle = orchestrator.start(options.clone()).unwrap();

        let err = orchestrator.start(options).unwrap_err();
        assert!(matches!(err, AppError::RunInProgress));

        release_tx.send(()).unwrap();
        handle.join().unwrap();
        assert_eq!(orchestrator.phase(), RunPhase::Completed);
    }
}
