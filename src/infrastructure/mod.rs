//! Infrastructure layer - external adapters (database, filesystem).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod accounts;
pub mod backup_versioner;
pub mod config;
pub mod events;
pub mod exporter;
pub mod fingerprint;
pub mod history;
pub mod message_store;
pub mod tree_scanner;

pub use accounts::{account_exists, discover_accounts, refresh_accounts};
pub use backup_versioner::BackupVersioner;
pub use config::{
    load_accounts_config, load_backup_config, load_export_config, save_accounts_config,
    save_backup_config, save_export_config,
};
pub use events::ChannelSink;
pub use exporter::{InPlaceExporter, MirrorExporter, StoreExporter};
pub use fingerprint::{hash_file, stat_file, FileStat};
pub use history::HistoricalIndex;
pub use message_store::{Direction, MessageStore, SqliteMessageStore};
pub use tree_scanner::scan_tree;
