//! # mqttlink traits
//!
//! Seams between the connection layer and the collaborators it drives but
//! does not implement:
//!
//! - **MqttEngine / EngineCallback / EngineFactory**: the MQTT wire engine
//! - **MessageStore**: durable custody of arrived messages
//! - **PowerManager**: CPU wake guarantees
//! - **Connectivity**: network reachability
//! - **AlarmClock**: wake-capable timers for keep-alive pings

pub mod alarm;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod power;
pub mod store;

pub use alarm::{AlarmCallback, AlarmClock};
pub use connectivity::{Connectivity, StaticConnectivity};
pub use engine::{EngineCallback, EngineFactory, MessageListener, MqttEngine, Token};
pub use error::{
    EngineError, EngineResult, ExceptionPayload, MqttLinkError, Result, StoreError, StoreResult,
};
pub use power::{NoopPowerManager, PowerManager};
pub use store::MessageStore;
