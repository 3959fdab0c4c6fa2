//! Event model and the single typed channel that carries every asynchronous
//! result back to the application boundary.
//!
//! # Flow
//!
//! ```text
//! Connection ──┐
//! Connection ──┼──> EventSink (crossbeam unbounded) ──> ConnectionRegistry::recv_event()
//! TraceHandler ┘
//! ```
//!
//! Every asynchronous command produces exactly one terminal event (OK or
//! ERROR) correlated by the caller's activity token and invocation context.

use crate::core::message::{ClientHandle, MqttMessage};
use crate::error::{ExceptionPayload, MqttLinkError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, trace};

/// Outcome carried by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// What an event is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Connect,
    /// Any successful connect, including engine automatic reconnects
    ConnectExtended,
    Disconnect,
    Send,
    Subscribe,
    Unsubscribe,
    MessageArrived,
    MessageDelivered,
    ConnectionLost,
    Close,
    Trace,
}

/// Correlation fields the caller attached to a command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventContext {
    pub activity_token: Option<String>,
    pub invocation_context: Option<String>,
}

impl EventContext {
    pub fn new(activity_token: Option<&str>, invocation_context: Option<&str>) -> Self {
        Self {
            activity_token: activity_token.map(str::to_owned),
            invocation_context: invocation_context.map(str::to_owned),
        }
    }
}

/// Severity of a trace event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceSeverity {
    Debug,
    Error,
    Exception,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceDetail {
    pub severity: TraceSeverity,
    pub tag: String,
}

/// One asynchronous result or notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionEvent {
    pub client_handle: String,
    pub status: Status,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<MqttMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceDetail>,
}

impl ConnectionEvent {
    pub fn new(client_handle: impl Into<String>, status: Status, action: Action) -> Self {
        Self {
            client_handle: client_handle.into(),
            status,
            action,
            activity_token: None,
            invocation_context: None,
            error_message: None,
            exception: None,
            message_id: None,
            topic: None,
            message: None,
            reconnect: None,
            server_uri: None,
            trace: None,
        }
    }

    pub fn ok(handle: &ClientHandle, action: Action) -> Self {
        Self::new(handle.as_str(), Status::Ok, action)
    }

    pub fn error(handle: &ClientHandle, action: Action, err: &MqttLinkError) -> Self {
        let mut event = Self::new(handle.as_str(), Status::Error, action);
        event.error_message = Some(err.to_string());
        event.exception = Some(err.to_payload());
        event
    }

    pub fn with_context(mut self, ctx: &EventContext) -> Self {
        self.activity_token = ctx.activity_token.clone();
        self.invocation_context = ctx.invocation_context.clone();
        self
    }

    pub fn with_message(mut self, message_id: Option<String>, topic: &str, message: MqttMessage) -> Self {
        self.message_id = message_id;
        self.topic = Some(topic.to_owned());
        self.message = Some(message);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// JSON rendering for logs and host bridges
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("{{\"serialize_error\":\"{}\"}}", e))
    }
}

/// Sending half of the event channel, cloned into every Connection
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Sender<ConnectionEvent>,
}

impl EventSink {
    /// Create the sink and the receiver the application boundary drains
    pub fn channel() -> (Self, Receiver<ConnectionEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: ConnectionEvent) {
        trace!(event = %event.to_json(), "emit");
        // Receiver gone means the host is tearing down; nothing to deliver to
        let _ = self.tx.send(event);
    }
}

/// Application-visible tracing shared by all Connections
///
/// Every trace goes to `tracing`. When enabled and a callback id is set,
/// traces are additionally emitted as [`Action::Trace`] events addressed to
/// that id.
#[derive(Debug)]
pub struct TraceHandler {
    sink: EventSink,
    enabled: AtomicBool,
    callback_id: RwLock<Option<String>>,
}

impl TraceHandler {
    pub fn new(sink: EventSink, enabled: bool) -> Self {
        Self {
            sink,
            enabled: AtomicBool::new(enabled),
            callback_id: RwLock::new(None),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_callback_id(&self, id: Option<String>) {
        *self.callback_id.write() = id;
    }

    pub fn debug(&self, tag: &str, message: &str) {
        debug!(tag = %tag, "{}", message);
        if self.is_enabled() {
            self.emit(TraceSeverity::Debug, tag, message, None);
        }
    }

    pub fn error(&self, tag: &str, message: &str) {
        error!(tag = %tag, "{}", message);
        if self.is_enabled() {
            self.emit(TraceSeverity::Error, tag, message, None);
        }
    }

    /// Exceptions reach the callback id even with tracing disabled
    pub fn exception(&self, tag: &str, message: &str, err: &MqttLinkError) {
        error!(tag = %tag, error = %err, "{}", message);
        self.emit(TraceSeverity::Exception, tag, message, Some(err.to_payload()));
    }

    fn emit(&self, severity: TraceSeverity, tag: &str, message: &str, exception: Option<ExceptionPayload>) {
        let Some(id) = self.callback_id.read().clone() else {
            return;
        };
        let mut event = ConnectionEvent::new(id, Status::Error, Action::Trace);
        event.error_message = Some(message.to_owned());
        event.exception = exception;
        event.trace = Some(TraceDetail {
            severity,
            tag: tag.to_owned(),
        });
        self.sink.emit(event);
    }
}
