use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::message::{ClientHandle, MqttMessage, StoredMessage};
use crate::error::StoreResult;
use crate::store::MessageStore;

/// Volatile [`MessageStore`] for hosts without persistent storage and for tests
///
/// Satisfies the ordering and idempotence contract but not durability
/// across restarts.
#[derive(Debug, Default)]
pub struct MemoryMessageStore {
    messages: Mutex<HashMap<ClientHandle, Vec<StoredMessage>>>,
    next_id: AtomicU64,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored messages across all handles
    pub fn total_count(&self) -> usize {
        self.messages.lock().values().map(Vec::len).sum()
    }
}

impl MessageStore for MemoryMessageStore {
    fn store(&self, handle: &ClientHandle, topic: &str, message: &MqttMessage) -> StoreResult<String> {
        let id = (self.next_id.fetch_add(1, Ordering::Relaxed) + 1).to_string();
        let stored = StoredMessage {
            message_id: id.clone(),
            client_handle: handle.clone(),
            topic: topic.to_owned(),
            message: message.clone(),
            arrived_at: Utc::now(),
        };
        self.messages.lock().entry(handle.clone()).or_default().push(stored);
        Ok(id)
    }

    fn all_arrived(&self, handle: &ClientHandle) -> StoreResult<Vec<StoredMessage>> {
        Ok(self.messages.lock().get(handle).cloned().unwrap_or_default())
    }

    fn discard(&self, handle: &ClientHandle, message_id: &str) -> StoreResult<bool> {
        let mut messages = self.messages.lock();
        let Some(list) = messages.get_mut(handle) else {
            return Ok(false);
        };
        let Some(pos) = list.iter().position(|m| m.message_id == message_id) else {
            return Ok(false);
        };
        list.remove(pos);
        if list.is_empty() {
            messages.remove(handle);
        }
        Ok(true)
    }

    fn clear_arrived(&self, handle: &ClientHandle) -> StoreResult<usize> {
        Ok(self.messages.lock().remove(handle).map(|list| list.len()).unwrap_or(0))
    }
}
