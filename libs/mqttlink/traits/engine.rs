use crate::core::message::{MqttMessage, TopicFilter};
use crate::core::options::{BufferOptions, ConnectOptions};
use crate::error::{EngineResult, Result};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Correlation id of one asynchronous engine operation
///
/// Tokens are minted by the Connection and handed to the engine with the
/// call; the engine echoes them back through [`EngineCallback`]. For a
/// publish the same token is the delivery token.
pub type Token = u64;

/// The external MQTT wire engine, one instance per Connection
///
/// Every method hands work off and returns immediately. Outcomes of
/// operations that take a [`Token`] are reported later through
/// [`EngineCallback::action_complete`], from the engine's own threads.
///
/// # Contract
/// - A returned `Err` means the operation was never started and no
///   completion will follow for its token.
/// - Completions are never delivered synchronously from inside the call
///   that started them.
pub trait MqttEngine: Send + Sync {
    /// Start a network connect
    fn connect(&self, options: &ConnectOptions, context: Option<&str>, token: Token) -> EngineResult<()>;

    /// Ask the engine's own automatic-reconnect machinery to retry now
    fn reconnect(&self) -> EngineResult<()>;

    /// Start a disconnect, quiescing in-flight work for at most `quiesce`
    fn disconnect(&self, quiesce: Option<Duration>, context: Option<&str>, token: Token) -> EngineResult<()>;

    /// Start a publish; `token` becomes the delivery token
    fn publish(&self, topic: &str, message: &MqttMessage, context: Option<&str>, token: Token) -> EngineResult<()>;

    fn subscribe(&self, filters: &[TopicFilter], context: Option<&str>, token: Token) -> EngineResult<()>;

    /// Subscribe with one listener per filter (same length as `filters`)
    fn subscribe_with_listeners(
        &self,
        filters: &[TopicFilter],
        listeners: Vec<Arc<dyn MessageListener>>,
        context: Option<&str>,
        token: Token,
    ) -> EngineResult<()>;

    fn unsubscribe(&self, topics: &[String], context: Option<&str>, token: Token) -> EngineResult<()>;

    fn is_connected(&self) -> bool;

    /// Delivery tokens of publishes not yet confirmed
    fn pending_delivery_tokens(&self) -> Vec<Token>;

    /// Send a ping if nothing else happened recently
    ///
    /// Returns `false` when no check could be started; in that case no
    /// completion will arrive for `token`.
    fn check_for_activity(&self, token: Token) -> bool;

    fn set_buffer_options(&self, options: BufferOptions);

    fn buffered_message_count(&self) -> usize;

    fn buffered_message(&self, index: usize) -> Option<MqttMessage>;

    fn delete_buffered_message(&self, index: usize) -> EngineResult<()>;

    /// Release every resource held by the engine
    fn close(&self) -> EngineResult<()>;
}

/// Push-style callbacks from the wire engine to its owning Connection
pub trait EngineCallback: Send + Sync {
    /// Completion of an operation started with `token`
    fn action_complete(&self, token: Token, outcome: EngineResult<()>);

    /// Any successful connect, including ones made by automatic reconnect
    fn connect_complete(&self, reconnect: bool, server_uri: &str);

    fn connection_lost(&self, cause: Option<crate::error::EngineError>);

    /// The publish identified by `token` is delivered for its QoS
    fn delivery_complete(&self, token: Token);

    /// A message arrived on a subscribed topic
    ///
    /// An `Err` tells the engine the message was not taken into custody and
    /// must not be acknowledged to the broker.
    fn message_arrived(&self, topic: &str, message: MqttMessage) -> Result<()>;
}

/// Per-subscription listener handed through to the engine
pub trait MessageListener: Send + Sync {
    fn message_arrived(&self, topic: &str, message: &MqttMessage);
}

/// Creates engine instances; the Connection calls this lazily on first connect
pub trait EngineFactory: Send + Sync {
    fn create(
        &self,
        server_uri: &str,
        client_id: &str,
        callback: Weak<dyn EngineCallback>,
    ) -> EngineResult<Arc<dyn MqttEngine>>;
}
