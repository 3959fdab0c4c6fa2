use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for mqttlink
#[derive(Error, Debug, Clone)]
pub enum MqttLinkError {
    /// Operation needs a live connection and no offline buffer applies
    #[error("not connected")]
    NotConnected,

    /// No Connection is registered under this client handle
    #[error("Invalid client handle: {0}")]
    InvalidHandle(String),

    /// Strict initialisation of a handle that is already registered
    #[error("Client handle already initialized: {0}")]
    AlreadyInitialized(String),

    /// The Connection has no engine handle yet (connect was never issued)
    #[error("Client handle not initialized: {0}")]
    NotInitialized(String),

    /// Wrapped wire-engine failure
    #[error("Engine failure: {0}")]
    Engine(#[from] EngineError),

    /// Message Store read/write failure
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// Reconnect attempted with no network
    #[error("Network unreachable")]
    Unreachable,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl MqttLinkError {
    /// Short machine-readable name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            MqttLinkError::NotConnected => "not_connected",
            MqttLinkError::InvalidHandle(_) => "invalid_handle",
            MqttLinkError::AlreadyInitialized(_) => "already_initialized",
            MqttLinkError::NotInitialized(_) => "not_initialized",
            MqttLinkError::Engine(_) => "engine_failure",
            MqttLinkError::Persistence(_) => "persistence_failure",
            MqttLinkError::Unreachable => "unreachable",
            MqttLinkError::Configuration(_) => "configuration",
        }
    }

    /// Convert into the structured payload carried by error events
    pub fn to_payload(&self) -> ExceptionPayload {
        match self {
            MqttLinkError::Engine(e) => e.to_payload(),
            other => ExceptionPayload {
                kind: other.kind().to_string(),
                message: other.to_string(),
                reason_code: None,
                cause: None,
            },
        }
    }
}

/// Failure reported by the wire engine, either synchronously from a call or
/// asynchronously through a completion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EngineError {
    /// Engine-specific reason code, when the engine supplies one
    pub reason_code: Option<i32>,
    pub message: String,
    /// Rendered cause chain, if any
    pub cause: Option<String>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            reason_code: None,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_reason(mut self, reason_code: i32) -> Self {
        self.reason_code = Some(reason_code);
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn to_payload(&self) -> ExceptionPayload {
        ExceptionPayload {
            kind: "engine_failure".to_string(),
            message: self.message.clone(),
            reason_code: self.reason_code,
            cause: self.cause.clone(),
        }
    }
}

/// Message Store errors
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Structured error detail attached to error events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionPayload {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

/// Result type for mqttlink operations
pub type Result<T> = std::result::Result<T, MqttLinkError>;

/// Result type for engine calls
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Result type for Message Store calls
pub type StoreResult<T> = std::result::Result<T, StoreError>;
