//! Read-only access to the decrypted per-account message store.
//!
//! The store itself is an external collaborator; this module defines its
//! interface boundary plus a `SQLite`-backed implementation reading the
//! already-decrypted databases under an account's `Msg/` directory.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::domain::{
    AppError, Contact, FileInfo, Message, MusicInfo, Result, SelfProfile, SenderIdentity,
};

/// Paging direction relative to a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Messages at or after the timestamp, oldest first.
    Backward,
    /// Messages at or before the timestamp, newest first.
    Forward,
}

/// Interface boundary of the message store.
pub trait MessageStore: Send {
    /// The current account's own profile.
    fn self_profile(&self) -> Result<SelfProfile>;

    /// One page of known contacts.
    fn list_contacts(&self, page: usize, page_size: usize) -> Result<Vec<Contact>>;

    /// One page of a contact's messages relative to `cutoff`.
    fn list_messages_since(
        &self,
        contact_id: &str,
        cutoff: i64,
        page_size: usize,
        offset: usize,
        direction: Direction,
    ) -> Result<Vec<Message>>;

    /// Resolve a user's original nickname, memoized per store handle.
    fn resolve_nickname_cached(&self, user_name: &str) -> Result<String>;
}

/// `SQLite`-backed message store over `<account>/Msg/msg.db`.
pub struct SqliteMessageStore {
    conn: Connection,
    nickname_cache: Mutex<HashMap<String, String>>,
}

impl SqliteMessageStore {
    /// Opens the account's store database in read-only mode.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened.
    pub fn open(msg_dir: &Path) -> Result<Self> {
        let db_path = msg_dir.join("msg.db");
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags).map_err(AppError::database)?;

        conn.execute_batch(
            "PRAGMA query_only = ON;
             PRAGMA temp_store = MEMORY;",
        )
        .map_err(AppError::database)?;

        tracing::debug!(path = %db_path.display(), "Opened message store");

        Ok(Self {
            conn,
            nickname_cache: Mutex::new(HashMap::new()),
        })
    }

    fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<Message> {
        Ok(Message {
            raw_type: row.get(0)?,
            raw_sub_type: row.get(1)?,
            create_time: row.get(2)?,
            is_sender: row.get::<_, i64>(3)? != 0,
            content: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            image_path: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            video_path: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            voice_path: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            thumb_path: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
            file_info: FileInfo {
                file_name: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
                file_path: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
            },
            music_info: MusicInfo {
                title: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
                display_name: row.get::<_, Option<String>>(12)?.unwrap_or_default(),
            },
            location_label: row.get::<_, Option<String>>(13)?.unwrap_or_default(),
            card_nick_name: row.get::<_, Option<String>>(14)?.unwrap_or_default(),
            sender: SenderIdentity {
                user_name: row.get::<_, Option<String>>(15)?.unwrap_or_default(),
                nick_name: row.get::<_, Option<String>>(16)?.unwrap_or_default(),
            },
        })
    }
}

impl MessageStore for SqliteMessageStore {
    fn self_profile(&self) -> Result<SelfProfile> {
        self.conn
            .query_row(
                "SELECT user_name, nick_name FROM profile LIMIT 1",
                [],
                |row| {
                    Ok(SelfProfile {
                        user_name: row.get(0)?,
                        nick_name: row.get(1)?,
                    })
                },
            )
            .map_err(AppError::database)
    }

    fn list_contacts(&self, page: usize, page_size: usize) -> Result<Vec<Contact>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT user_name, nick_name, remark, is_group
                 FROM contact ORDER BY user_name LIMIT ?1 OFFSET ?2",
            )
            .map_err(AppError::database)?;

        let rows = stmt
            .query_map(params![page_size as i64, (page * page_size) as i64], |row| {
                Ok(Contact {
                    user_name: row.get(0)?,
                    nick_name: row.get(1)?,
                    remark: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    is_group: row.get::<_, i64>(3)? != 0,
                })
            })
            .map_err(AppError::database)?;

        let mut contacts = Vec::new();
        for row in rows {
            contacts.push(row.map_err(AppError::database)?);
        }
        Ok(contacts)
    }

    fn list_messages_since(
        &self,
        contact_id: &str,
        cutoff: i64,
        page_size: usize,
        offset: usize,
        direction: Direction,
    ) -> Result<Vec<Message>> {
        let query = match direction {
            Direction::Backward => {
                "SELECT type, sub_type, create_time, is_sender, content,
                        image_path, video_path, voice_path, thumb_path,
                        file_name, file_path, music_title, music_display_name,
                        location_label, card_nick_name,
                        sender_user_name, sender_nick_name
                 FROM message
                 WHERE talker = ?1 AND create_time >= ?2
                 ORDER BY create_time ASC LIMIT ?3 OFFSET ?4"
            }
            Direction::Forward => {
                "SELECT type, sub_type, create_time, is_sender, content,
                        image_path, video_path, voice_path, thumb_path,
                        file_name, file_path, music_title, music_display_name,
                        location_label, card_nick_name,
                        sender_user_name, sender_nick_name
                 FROM message
                 WHERE talker = ?1 AND create_time <= ?2
                 ORDER BY create_time DESC LIMIT ?3 OFFSET ?4"
            }
        };

        let mut stmt = self.conn.prepare(query).map_err(AppError::database)?;
        let rows = stmt
            .query_map(
                params![contact_id, cutoff, page_size as i64, offset as i64],
                Self::row_to_message,
            )
            .map_err(AppError::database)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row.map_err(AppError::database)?);
        }
        Ok(messages)
    }

    fn resolve_nickname_cached(&self, user_name: &str) -> Result<String> {
        if let Ok(cache) = self.nickname_cache.lock() {
            if let Some(hit) = cache.get(user_name) {
                return Ok(hit.clone());
            }
        }

        let nickname: Option<String> = self
            .conn
            .query_row(
                "SELECT nick_name FROM contact WHERE user_name = ?1",
                [user_name],
                |row| row.get(0),
            )
            .optional()
            .map_err(AppError::database)?;

        let nickname = nickname.ok_or_else(|| AppError::InvalidData {
            message: format!("No cached user info for {user_name}"),
        })?;

        if let Ok(mut cache) = self.nickname_cache.lock() {
            cache.insert(user_name.to_string(), nickname.clone());
        }
        Ok(nickname)
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Fixture builder for store-backed tests.

    use super::*;
    use std::fs;

    /// Create an empty store database with the expected schema.
    pub fn create_store(msg_dir: &Path) -> Connection {
        fs::create_dir_all(msg_dir).unwrap();
        let conn = Connection::open(msg_dir.join("msg.db")).unwrap();
        conn.execute_batch(
            "CREATE TABLE profile (user_name TEXT NOT NULL, nick_name TEXT NOT NULL);
             CREATE TABLE contact (
                 user_name TEXT PRIMARY KEY,
                 nick_name TEXT NOT NULL,
                 remark TEXT,
                 is_group INTEGER NOT NULL DEFAULT 0
             );
             CREATE TABLE message (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 talker TEXT NOT NULL,
                 type INTEGER NOT NULL,
                 sub_type INTEGER NOT NULL DEFAULT 0,
                 create_time INTEGER NOT NULL,
                 is_sender INTEGER NOT NULL DEFAULT 0,
                 content TEXT,
                 image_path TEXT,
                 video_path TEXT,
                 voice_path TEXT,
                 thumb_path TEXT,
                 file_name TEXT,
                 file_path TEXT,
                 music_title TEXT,
                 music_display_name TEXT,
                 location_label TEXT,
                 card_nick_name TEXT,
                 sender_user_name TEXT,
                 sender_nick_name TEXT
             );",
        )
        .unwrap();
        conn
    }

    pub fn insert_profile(conn: &Connection, user_name: &str, nick_name: &str) {
        conn.execute(
            "INSERT INTO profile (user_name, nick_name) VALUES (?1, ?2)",
            params![user_name, nick_name],
        )
        .unwrap();
    }

    pub fn insert_contact(conn: &Connection, user_name: &str, nick_name: &str, is_group: bool) {
        conn.execute(
            "INSERT INTO contact (user_name, nick_name, is_group) VALUES (?1, ?2, ?3)",
            params![user_name, nick_name, is_group as i64],
        )
        .unwrap();
    }

    pub fn insert_text_message(
        conn: &Connection,
        talker: &str,
        create_time: i64,
        is_sender: bool,
        content: &str,
    ) {
        conn.execute(
            "INSERT INTO message (talker, type, sub_type, create_time, is_sender, content)
             VALUES (?1, 1, 0, ?2, ?3, ?4)",
            params![talker, create_time, is_sender as i64, content],
        )
        .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_profile_and_contacts() {
        let dir = tempdir().unwrap();
        let msg_dir = dir.path().join("Msg");
        let conn = create_store(&msg_dir);
        insert_profile(&conn, "wxid_self", "Me");
        insert_contact(&conn, "wxid_a", "Alice", false);
        insert_contact(&conn, "room_1", "Work Group", true);
        drop(conn);

        let store = SqliteMessageStore::open(&msg_dir).unwrap();
        assert_eq!(store.self_profile().unwrap().nick_name, "Me");

        let contacts = store.list_contacts(0, 10).unwrap();
        assert_eq!(contacts.len(), 2);
        assert!(contacts.iter().any(|c| c.is_group && c.nick_name == "Work Group"));
    }

    #[test]
    fn test_backward_paging_from_cutoff() {
        let dir = tempdir().unwrap();
        let msg_dir = dir.path().join("Msg");
        let conn = create_store(&msg_dir);
        for t in [100, 200, 300, 400] {
            insert_text_message(&conn, "wxid_a", t, false, &format!("m{t}"));
        }
        drop(conn);

        let store = SqliteMessageStore::open(&msg_dir).unwrap();
        let page = store
            .list_messages_since("wxid_a", 200, 2, 0, Direction::Backward)
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].create_time, 200);
        assert_eq!(page[1].create_time, 300);

        let page2 = store
            .list_messages_since("wxid_a", 200, 2, 2, Direction::Backward)
            .unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].create_time, 400);
    }

    #[test]
    fn test_nickname_resolution_and_cache() {
        let dir = tempdir().unwrap();
        let msg_dir = dir.path().join("Msg");
        let conn = create_store(&msg_dir);
        insert_contact(&conn, "wxid_a", "Alice", false);
        drop(conn);

        let store = SqliteMessageStore::open(&msg_dir).unwrap();
        assert_eq!(store.resolve_nickname_cached("wxid_a").unwrap(), "Alice");
        // Served from cache the second time.
        assert_eq!(store.resolve_nickname_cached("wxid_a").unwrap(), "Alice");
        assert!(store.resolve_nickname_cached("wxid_unknown").is_err());
    }

    #[test]
    fn test_missing_database_fails_to_open() {
        let dir = tempdir().unwrap();
        assert!(SqliteMessageStore::open(&dir.path().join("Msg")).is_err());
    }
}
