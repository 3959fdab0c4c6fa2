//! Message and identity types shared by every layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique key of one logical Connection
///
/// Derived from `(server_uri, client_id, context_id)`. Two calls with the same
/// triple always yield the same handle, which is what lets a restarted host
/// find the backlog persisted for that client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientHandle(String);

impl ClientHandle {
    pub fn new(server_uri: &str, client_id: &str, context_id: &str) -> Self {
        Self(format!("{}:{}:{}", server_uri, client_id, context_id))
    }

    /// Wrap an already formatted handle (e.g. one read back from storage)
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClientHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// MQTT quality of service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Qos {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl From<Qos> for u8 {
    fn from(qos: Qos) -> u8 {
        match qos {
            Qos::AtMostOnce => 0,
            Qos::AtLeastOnce => 1,
            Qos::ExactlyOnce => 2,
        }
    }
}

impl TryFrom<u8> for Qos {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Qos::AtMostOnce),
            1 => Ok(Qos::AtLeastOnce),
            2 => Ok(Qos::ExactlyOnce),
            other => Err(format!("invalid QoS level: {}", other)),
        }
    }
}

/// An application message as handed to / received from the wire engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttMessage {
    pub payload: Vec<u8>,
    pub qos: Qos,
    pub retained: bool,
    /// Set by the engine on redelivered inbound messages
    #[serde(default)]
    pub duplicate: bool,
}

impl MqttMessage {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            qos: Qos::default(),
            retained: false,
            duplicate: false,
        }
    }

    pub fn with_qos(mut self, qos: Qos) -> Self {
        self.qos = qos;
        self
    }

    pub fn with_retained(mut self, retained: bool) -> Self {
        self.retained = retained;
        self
    }

    pub fn with_duplicate(mut self, duplicate: bool) -> Self {
        self.duplicate = duplicate;
        self
    }

    /// Payload as UTF-8, lossy
    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// A topic filter with the QoS requested for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicFilter {
    pub topic: String,
    pub qos: Qos,
}

impl TopicFilter {
    pub fn new(topic: impl Into<String>, qos: Qos) -> Self {
        Self {
            topic: topic.into(),
            qos,
        }
    }
}

/// An arrived message persisted until the application acknowledges it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub message_id: String,
    pub client_handle: ClientHandle,
    pub topic: String,
    pub message: MqttMessage,
    pub arrived_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_handle_format() {
        let handle = ClientHandle::new("tcp://broker:1883", "device-7", "app");
        assert_eq!(handle.as_str(), "tcp://broker:1883:device-7:app");
        assert_eq!(handle, ClientHandle::new("tcp://broker:1883", "device-7", "app"));
        assert_ne!(handle, ClientHandle::new("tcp://broker:1883", "device-7", "other"));
    }

    #[test]
    fn test_qos_conversion() {
        assert_eq!(Qos::try_from(1).unwrap(), Qos::AtLeastOnce);
        assert_eq!(u8::from(Qos::ExactlyOnce), 2);
        assert!(Qos::try_from(3).is_err());
    }

    #[test]
    fn test_message_builder() {
        let msg = MqttMessage::new("21.5")
            .with_qos(Qos::AtLeastOnce)
            .with_retained(true);
        assert_eq!(msg.payload_str(), "21.5");
        assert_eq!(msg.qos, Qos::AtLeastOnce);
        assert!(msg.retained);
        assert!(!msg.duplicate);
    }
}
