//! # mqttlink core
//!
//! Value types, the event model and the per-Connection machinery:
//!
//! - **Connection**: lifecycle state machine around one wire engine
//! - **KeepAliveScheduler**: one recurring wake per started Connection
//! - **WakeLock / WakeGuard**: scoped wake guarantees
//! - **EventSink / TraceHandler**: the single typed event channel

pub mod alarm_clock;
pub mod config;
pub mod connection;
pub mod connection_state;
pub mod event;
pub mod keepalive;
pub mod logging;
pub mod message;
pub mod options;
pub mod wakelock;

pub use alarm_clock::{TokioAlarmClock, VirtualAlarmClock};
pub use config::{ConfigError, ServiceConfig};
pub use connection::{Collaborators, Connection};
pub use connection_state::{AtomicConnectionState, ConnectionState};
pub use event::{Action, ConnectionEvent, EventContext, EventSink, Status, TraceDetail, TraceHandler, TraceSeverity};
pub use keepalive::{ActivityCheck, KeepAliveScheduler};
pub use logging::init_tracing;
pub use message::{ClientHandle, MqttMessage, Qos, StoredMessage, TopicFilter};
pub use options::{BufferOptions, ConnectOptions};
pub use wakelock::{TrackingPowerManager, WakeGuard, WakeLock};
