//! Persistent SQLite database for handled updates and conversation turns.

use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "assistant" => Role::Assistant,
            _ => Role::User,
        }
    }
}

/// One stored conversation turn.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Persistent SQLite database for the bot.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Create a new in-memory database.
    pub fn new() -> Self {
        let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
        let db = Self { conn: Mutex::new(conn) };
        db.init_schema();
        db
    }

    /// Load from file if it exists, otherwise create new.
    pub fn load_or_new(path: &Path) -> Self {
        let conn = Connection::open(path).expect("Failed to open database");
        let db = Self { conn: Mutex::new(conn) };
        db.init_schema();

        let (update_count, turn_count) = db.counts();
        info!(
            "Loaded database from {:?} ({} handled updates, {} turns)",
            path, update_count, turn_count
        );

        db
    }

    fn init_schema(&self) {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS processed_updates (
                chat_id INTEGER NOT NULL,
                message_id INTEGER NOT NULL,
                processed_at TEXT NOT NULL,
                PRIMARY KEY (chat_id, message_id)
            );

            CREATE TABLE IF NOT EXISTS turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_turns_chat_id ON turns(chat_id);
        "#,
        )
        .expect("Failed to initialize database schema");
    }

    fn counts(&self) -> (usize, usize) {
        let conn = self.conn.lock().unwrap();
        let updates: i64 = conn
            .query_row("SELECT COUNT(*) FROM processed_updates", [], |row| row.get(0))
            .unwrap_or(0);
        let turns: i64 = conn
            .query_row("SELECT COUNT(*) FROM turns", [], |row| row.get(0))
            .unwrap_or(0);
        (updates as usize, turns as usize)
    }

    // ==================== DEDUPLICATION ====================

    /// Check whether an inbound message was already handled.
    /// Telegram message ids are per-chat, so the key is (chat_id, message_id).
    pub fn is_processed(&self, chat_id: i64, message_id: i64) -> bool {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT 1 FROM processed_updates WHERE chat_id = ?1 AND message_id = ?2",
            params![chat_id, message_id],
            |_| Ok(()),
        )
        .is_ok()
    }

    /// Record a message as handled.
    pub fn mark_processed(&self, chat_id: i64, message_id: i64, timestamp: &str) {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO processed_updates (chat_id, message_id, processed_at) VALUES (?1, ?2, ?3)",
            params![chat_id, message_id, timestamp],
        )
        .unwrap_or_else(|e| {
            warn!("Failed to mark message processed: {e}");
            0
        });
    }

    // ==================== CONVERSATION TURNS ====================

    /// Append a turn to a chat's conversation log.
    pub fn append_turn(&self, chat_id: i64, role: Role, content: &str, timestamp: &str) {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO turns (chat_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![chat_id, role.as_str(), content, timestamp],
        )
        .unwrap_or_else(|e| {
            warn!("Failed to append turn: {e}");
            0
        });
    }

    /// Get the last `limit` turns for a chat, oldest first.
    pub fn recent_turns(&self, chat_id: i64, limit: usize) -> Vec<Turn> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = match conn.prepare(
            "SELECT role, content FROM turns WHERE chat_id = ?1 ORDER BY id DESC LIMIT ?2",
        ) {
            Ok(stmt) => stmt,
            Err(e) => {
                warn!("Failed to prepare turn query: {e}");
                return Vec::new();
            }
        };

        let rows = stmt.query_map(params![chat_id, limit as i64], |row| {
            Ok(Turn {
                role: Role::from_str(&row.get::<_, String>(0)?),
                content: row.get(1)?,
            })
        });

        let mut result: Vec<Turn> = match rows {
            Ok(rows) => rows.flatten().collect(),
            Err(e) => {
                warn!("Failed to read turns: {e}");
                return Vec::new();
            }
        };

        result.reverse();
        result
    }

    /// Total turn count for a chat.
    #[cfg(test)]
    pub fn turn_count(&self, chat_id: i64) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM turns WHERE chat_id = ?1",
            params![chat_id],
            |row| row.get::<_, i64>(0),
        )
        .unwrap_or(0) as usize
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_check_processed() {
        let db = Database::new();
        assert!(!db.is_processed(100, 1));

        db.mark_processed(100, 1, "2026-08-01 10:00");
        assert!(db.is_processed(100, 1));

        // Same message id in another chat is a different update
        assert!(!db.is_processed(200, 1));
    }

    #[test]
    fn test_mark_processed_is_idempotent() {
        let db = Database::new();
        db.mark_processed(100, 1, "2026-08-01 10:00");
        db.mark_processed(100, 1, "2026-08-01 10:01");
        assert!(db.is_processed(100, 1));
    }

    #[test]
    fn test_turns_replay_in_order() {
        let db = Database::new();
        db.append_turn(100, Role::User, "gasté 500 en helado", "2026-08-01 10:00");
        db.append_turn(100, Role::Assistant, "Gasto registrado", "2026-08-01 10:00");
        db.append_turn(100, Role::User, "cobré el sueldo", "2026-08-01 10:01");

        let turns = db.recent_turns(100, 10);
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "gasté 500 en helado");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[2].content, "cobré el sueldo");
    }

    #[test]
    fn test_turns_are_per_chat() {
        let db = Database::new();
        db.append_turn(100, Role::User, "hola", "2026-08-01 10:00");
        db.append_turn(200, Role::User, "chau", "2026-08-01 10:00");

        assert_eq!(db.turn_count(100), 1);
        assert_eq!(db.recent_turns(200, 10)[0].content, "chau");
    }

    #[test]
    fn test_recent_turns_keeps_latest() {
        let db = Database::new();
        for i in 0..10 {
            db.append_turn(100, Role::User, &format!("mensaje {i}"), "2026-08-01 10:00");
        }

        let turns = db.recent_turns(100, 4);
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].content, "mensaje 6");
        assert_eq!(turns[3].content, "mensaje 9");
    }

    #[test]
    fn test_recent_turns_empty_chat() {
        let db = Database::new();
        assert!(db.recent_turns(42, 10).is_empty());
    }
}
