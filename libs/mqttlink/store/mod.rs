//! # Message Store implementations
//!
//! - [`SqliteMessageStore`]: durable, survives process restarts
//! - [`MemoryMessageStore`]: volatile, same ordering contract

pub mod memory;
pub mod schema;
pub mod sqlite;

pub use crate::traits::store::MessageStore;
pub use memory::MemoryMessageStore;
pub use sqlite::SqliteMessageStore;
