use crate::core::message::{ClientHandle, MqttMessage, StoredMessage};
use crate::error::StoreResult;

/// Durable custody of arrived-but-unacknowledged messages
///
/// Implementations must tolerate concurrent `store` calls from engine
/// callback threads and `discard` calls from application acknowledgements.
pub trait MessageStore: Send + Sync {
    /// Append a message for `handle`; the record is durable once this returns
    ///
    /// # Returns
    /// The newly assigned message id
    fn store(&self, handle: &ClientHandle, topic: &str, message: &MqttMessage) -> StoreResult<String>;

    /// Snapshot of everything currently stored for `handle`, in arrival order
    ///
    /// Each call replays the current contents; earlier snapshots have no
    /// effect on later ones.
    fn all_arrived(&self, handle: &ClientHandle) -> StoreResult<Vec<StoredMessage>>;

    /// Remove one message
    ///
    /// # Returns
    /// * `Ok(true)` - the message was stored and is now removed
    /// * `Ok(false)` - no such message (already discarded or never stored)
    fn discard(&self, handle: &ClientHandle, message_id: &str) -> StoreResult<bool>;

    /// Remove every message stored for `handle`, returning how many went
    fn clear_arrived(&self, handle: &ClientHandle) -> StoreResult<usize>;

    /// Flush and release underlying resources
    fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}
