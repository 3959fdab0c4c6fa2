//! # mqttlink manager
//!
//! Process-wide supervision of logical connections: routing commands by
//! client handle and fanning network changes out to every Connection.

pub mod network;
pub mod registry;

pub use network::NetworkMonitor;
pub use registry::{ConnectionRegistry, ConnectionRegistryBuilder};
