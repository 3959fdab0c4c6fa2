use crate::core::message::{MqttMessage, Qos};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for a CONNECT request
///
/// Only `clean_session`, `automatic_reconnect` and `keep_alive` drive
/// behaviour in this layer; the remaining fields are passed through to the
/// wire engine untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    /// Discard session state (including the arrived-message backlog) on connect/disconnect
    pub clean_session: bool,

    /// Let the engine reconnect on its own after a connection loss
    pub automatic_reconnect: bool,

    /// Keep-alive interval; zero disables the keep-alive scheduler
    pub keep_alive: Duration,

    /// Maximum time the engine waits for CONNACK
    pub connection_timeout: Duration,

    pub username: Option<String>,

    pub password: Option<String>,

    /// Last will (topic, message)
    pub will: Option<(String, MqttMessage)>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            clean_session: true,
            automatic_reconnect: false,
            keep_alive: Duration::from_secs(60),
            connection_timeout: Duration::from_secs(30),
            username: None,
            password: None,
            will: None,
        }
    }
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clean_session(mut self, clean: bool) -> Self {
        self.clean_session = clean;
        self
    }

    pub fn automatic_reconnect(mut self, enabled: bool) -> Self {
        self.automatic_reconnect = enabled;
        self
    }

    pub fn keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn will(mut self, topic: impl Into<String>, payload: impl Into<Vec<u8>>, qos: Qos) -> Self {
        self.will = Some((topic.into(), MqttMessage::new(payload).with_qos(qos)));
        self
    }
}

/// Offline-publish buffer policy, owned and enforced by the wire engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferOptions {
    pub buffer_enabled: bool,
    pub buffer_size: usize,
    pub persist_buffer: bool,
    pub delete_oldest_messages: bool,
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self {
            buffer_enabled: false,
            buffer_size: 5000,
            persist_buffer: false,
            delete_oldest_messages: false,
        }
    }
}

impl BufferOptions {
    /// Buffer enabled with default capacity
    pub fn enabled() -> Self {
        Self {
            buffer_enabled: true,
            ..Self::default()
        }
    }
}
