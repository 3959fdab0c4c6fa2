use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::core::message::{ClientHandle, MqttMessage, Qos, StoredMessage};
use crate::error::{StoreError, StoreResult};
use crate::store::schema;
use crate::store::MessageStore;

/// Durable [`MessageStore`] on SQLite.
/// Uses parking_lot::Mutex for synchronous access from engine and application threads.
pub struct SqliteMessageStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteMessageStore {
    /// Open or create a store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(format!("create dir: {e}")))?;
        }

        let conn = Connection::open(path)?;
        Self::init(&conn)?;
        info!(path = %path.display(), "message store opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_owned(),
        })
    }

    /// Open an in-memory store (contents die with the process).
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
        })
    }

    fn init(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(schema::PRAGMAS)
            .map_err(|e| StoreError::Database(format!("pragmas: {e}")))?;
        conn.execute_batch(schema::CREATE_TABLES)
            .map_err(|e| StoreError::Database(format!("schema: {e}")))?;

        let version: Option<u32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .optional()?;
        if version.is_none() {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [schema::SCHEMA_VERSION],
            )
            .map_err(|e| StoreError::Database(format!("schema version: {e}")))?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total number of stored messages across all handles
    pub fn total_count(&self) -> StoreResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM arrived_messages", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl Clone for SqliteMessageStore {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            path: self.path.clone(),
        }
    }
}

struct ArrivedRow {
    id: i64,
    client_handle: String,
    topic: String,
    payload: Vec<u8>,
    qos: u8,
    retained: bool,
    duplicate: bool,
    arrived_at: String,
}

impl ArrivedRow {
    fn into_stored(self) -> StoreResult<StoredMessage> {
        let qos = Qos::try_from(self.qos).map_err(|e| StoreError::Corrupt(format!("message {}: {e}", self.id)))?;
        let arrived_at = DateTime::parse_from_rfc3339(&self.arrived_at)
            .map_err(|e| StoreError::Corrupt(format!("message {}: arrived_at: {e}", self.id)))?
            .with_timezone(&Utc);

        Ok(StoredMessage {
            message_id: self.id.to_string(),
            client_handle: ClientHandle::from_raw(self.client_handle),
            topic: self.topic,
            message: MqttMessage {
                payload: self.payload,
                qos,
                retained: self.retained,
                duplicate: self.duplicate,
            },
            arrived_at,
        })
    }
}

impl MessageStore for SqliteMessageStore {
    fn store(&self, handle: &ClientHandle, topic: &str, message: &MqttMessage) -> StoreResult<String> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO arrived_messages (client_handle, topic, payload, qos, retained, duplicate, arrived_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                handle.as_str(),
                topic,
                message.payload,
                u8::from(message.qos),
                message.retained,
                message.duplicate,
                Utc::now().to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(handle = %handle, message_id = id, "stored arrived message");
        Ok(id.to_string())
    }

    fn all_arrived(&self, handle: &ClientHandle) -> StoreResult<Vec<StoredMessage>> {
        let rows = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(
                "SELECT id, client_handle, topic, payload, qos, retained, duplicate, arrived_at
                 FROM arrived_messages WHERE client_handle = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt
                .query_map([handle.as_str()], |row| {
                    Ok(ArrivedRow {
                        id: row.get(0)?,
                        client_handle: row.get(1)?,
                        topic: row.get(2)?,
                        payload: row.get(3)?,
                        qos: row.get(4)?,
                        retained: row.get(5)?,
                        duplicate: row.get(6)?,
                        arrived_at: row.get(7)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        rows.into_iter().map(ArrivedRow::into_stored).collect()
    }

    fn discard(&self, handle: &ClientHandle, message_id: &str) -> StoreResult<bool> {
        let Ok(id) = message_id.parse::<i64>() else {
            return Ok(false);
        };
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM arrived_messages WHERE id = ?1 AND client_handle = ?2",
            params![id, handle.as_str()],
        )?;
        Ok(removed > 0)
    }

    fn clear_arrived(&self, handle: &ClientHandle) -> StoreResult<usize> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM arrived_messages WHERE client_handle = ?1",
            [handle.as_str()],
        )?;
        Ok(removed)
    }

    fn close(&self) -> StoreResult<()> {
        let conn = self.conn.lock();
        // fold the WAL back into the main file; a no-op for in-memory stores
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        info!(path = %self.path.display(), "message store closed");
        Ok(())
    }
}
