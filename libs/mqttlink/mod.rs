//! # mqttlink
//!
//! Connection lifecycle and delivery assurance for MQTT clients on hosts
//! whose network and power state come and go.
//!
//! The wire protocol is delegated to an external engine behind
//! [`MqttEngine`]; this crate owns what sits around it:
//!
//! - **Registry**: logical connections keyed by client handle, concurrent routing
//! - **Connection**: connect/reconnect state machine, at most one connect in flight
//! - **Message Store**: arrived messages kept until the application acknowledges them
//! - **Keep-alive**: one wake-capable ping timer per connection
//! - **Events**: every asynchronous result on a single crossbeam channel
//!
//! ## Example
//!
//! ```rust,ignore
//! use mqttlink::*;
//!
//! let registry = ConnectionRegistry::builder()
//!     .engine_factory(Arc::new(MyEngineFactory))
//!     .store(Arc::new(SqliteMessageStore::open(Path::new("mqttlink.db"))?))
//!     .build()?;
//!
//! let handle = registry.get_or_create("tcp://broker:1883", "device-7", "app");
//! registry.connect(&handle, ConnectOptions::new().clean_session(false), EventContext::default())?;
//! registry.subscribe(&handle, "sensors/#", Qos::AtLeastOnce, EventContext::default())?;
//!
//! while let Ok(event) = registry.recv_event() {
//!     println!("{}", event.to_json());
//! }
//! ```

pub mod traits;
pub mod core;
pub mod store;
pub mod manager;

// Re-export all traits
pub use traits::*;

// Re-export core functionality
pub use crate::core::{
    alarm_clock::{TokioAlarmClock, VirtualAlarmClock},
    config::{ConfigError, ServiceConfig},
    connection::{Collaborators, Connection},
    connection_state::{AtomicConnectionState, ConnectionState},
    event::{Action, ConnectionEvent, EventContext, EventSink, Status, TraceHandler},
    keepalive::{ActivityCheck, KeepAliveScheduler},
    logging::init_tracing,
    message::{ClientHandle, MqttMessage, Qos, StoredMessage, TopicFilter},
    options::{BufferOptions, ConnectOptions},
    wakelock::{TrackingPowerManager, WakeGuard, WakeLock},
};

// Re-export stores and manager
pub use crate::store::{MemoryMessageStore, SqliteMessageStore};
pub use crate::manager::{ConnectionRegistry, ConnectionRegistryBuilder, NetworkMonitor};
