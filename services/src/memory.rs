//! Conversation memory: per-session exchange log with idempotent appends.
//!
//! Session ids are channel-prefixed (`tg_private_123`, `web_abc`) so channels
//! never share history. One row per completed exchange (user message plus the
//! reply it got), keyed by `(session_id, message_id)`; a redelivered channel
//! message is ignored instead of duplicated.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::debug;

use crate::errors::Result;

/// A stored user/bot exchange, chronological within a session.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryExchange {
    pub message_id: String,
    pub user_message: String,
    pub bot_reply: String,
    pub created_at: String,
}

/// SQLite-backed conversation log.
///
/// A single connection behind a mutex; WAL mode keeps concurrent readers
/// (ticket service on the same file) from blocking writes.
pub struct ConversationMemory {
    conn: Mutex<Connection>,
}

impl ConversationMemory {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Private in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS conversation_messages (
                 id           INTEGER PRIMARY KEY,
                 session_id   TEXT NOT NULL,
                 message_id   TEXT NOT NULL,
                 user_message TEXT NOT NULL,
                 bot_reply    TEXT NOT NULL,
                 created_at   TEXT NOT NULL,
                 UNIQUE (session_id, message_id)
             );
             CREATE INDEX IF NOT EXISTS idx_conversation_session
                 ON conversation_messages (session_id, id);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Record a completed exchange. Returns `false` when
    /// `(session_id, message_id)` was already stored (redelivery), in which
    /// case nothing changes.
    pub fn append(
        &self,
        session_id: &str,
        message_id: &str,
        user_message: &str,
        bot_reply: &str,
    ) -> Result<bool> {
        let conn = self.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO conversation_messages
                 (session_id, message_id, user_message, bot_reply, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session_id,
                message_id,
                user_message,
                bot_reply,
                Utc::now().to_rfc3339()
            ],
        )?;
        if inserted == 0 {
            debug!(target: "services::memory", session_id, message_id, "duplicate exchange ignored");
        }
        Ok(inserted > 0)
    }

    /// Last `limit` exchanges of a session, oldest first.
    pub fn history(&self, session_id: &str, limit: usize) -> Result<Vec<MemoryExchange>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT message_id, user_message, bot_reply, created_at
             FROM (SELECT * FROM conversation_messages
                   WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2)
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![session_id, limit as i64], |row| {
            Ok(MemoryExchange {
                message_id: row.get(0)?,
                user_message: row.get(1)?,
                bot_reply: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Render the last `limit` exchanges as `user:`/`bot:` lines for prompt
    /// injection. Empty string for an unknown session.
    pub fn format_history(&self, session_id: &str, limit: usize) -> Result<String> {
        let lines: Vec<String> = self
            .history(session_id, limit)?
            .into_iter()
            .map(|m| format!("user: {}\nbot: {}", m.user_message, m.bot_reply))
            .collect();
        Ok(lines.join("\n"))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // Poisoning only happens after a panic mid-statement; recover the
        // connection rather than cascading panics through the pipeline.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem() -> ConversationMemory {
        ConversationMemory::open_in_memory().unwrap()
    }

    #[test]
    fn append_and_read_back_in_order() {
        let m = mem();
        m.append("tg_private_1", "m1", "halo", "Halo! Ada yang bisa dibantu?")
            .unwrap();
        m.append("tg_private_1", "m2", "cek resi", "Nomor resinya berapa ya?")
            .unwrap();
        let h = m.history("tg_private_1", 10).unwrap();
        assert_eq!(h.len(), 2);
        assert_eq!(h[0].user_message, "halo");
        assert_eq!(h[1].bot_reply, "Nomor resinya berapa ya?");
    }

    #[test]
    fn redelivery_is_idempotent() {
        let m = mem();
        assert!(m.append("web_1", "m1", "cek resi", "Siap.").unwrap());
        assert!(!m.append("web_1", "m1", "cek resi", "Siap.").unwrap());
        assert_eq!(m.history("web_1", 10).unwrap().len(), 1);
    }

    #[test]
    fn sessions_are_isolated() {
        let m = mem();
        m.append("tg_private_1", "m1", "a", "ra").unwrap();
        m.append("web_1", "m1", "b", "rb").unwrap();
        assert_eq!(m.history("tg_private_1", 10).unwrap().len(), 1);
        assert_eq!(m.history("web_1", 10).unwrap()[0].user_message, "b");
    }

    #[test]
    fn window_keeps_most_recent() {
        let m = mem();
        for i in 0..8 {
            m.append("s", &format!("m{i}"), &format!("msg {i}"), "ok")
                .unwrap();
        }
        let h = m.history("s", 5).unwrap();
        assert_eq!(h.len(), 5);
        assert_eq!(h[0].user_message, "msg 3");
        assert_eq!(h[4].user_message, "msg 7");
    }

    #[test]
    fn formatted_history_uses_role_prefixes() {
        let m = mem();
        m.append("s", "m1", "dimana pesanan saya", "Sedang dikirim.")
            .unwrap();
        let f = m.format_history("s", 5).unwrap();
        assert_eq!(f, "user: dimana pesanan saya\nbot: Sedang dikirim.");
        assert_eq!(m.format_history("unknown", 5).unwrap(), "");
    }

    #[test]
    fn concurrent_writers_stay_isolated() {
        use std::sync::Arc;
        let m = Arc::new(mem());
        let mut handles = Vec::new();
        for t in 0..4 {
            let m = Arc::clone(&m);
            handles.push(std::thread::spawn(move || {
                let session = format!("tg_private_{t}");
                for i in 0..20 {
                    m.append(&session, &format!("m{i}"), &format!("q{i}"), "ok")
                        .unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        for t in 0..4 {
            assert_eq!(m.history(&format!("tg_private_{t}"), 100).unwrap().len(), 20);
        }
    }
}
