/// SQL DDL for the arrived-message store.
/// AUTOINCREMENT keeps message ids unique for the life of the file, so an
/// acknowledged id can never be reassigned to a later message.
pub const SCHEMA_VERSION: u32 = 1;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS arrived_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_handle TEXT NOT NULL,
    topic TEXT NOT NULL,
    payload BLOB NOT NULL,
    qos INTEGER NOT NULL,
    retained INTEGER NOT NULL DEFAULT 0,
    duplicate INTEGER NOT NULL DEFAULT 0,
    arrived_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_arrived_handle ON arrived_messages(client_handle, id);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

/// `synchronous = FULL`: a stored message must survive power loss once
/// `store` has returned.
pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = FULL;
"#;
