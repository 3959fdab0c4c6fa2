use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Environment variable that overrides `store.path`
pub const STORE_PATH_ENV: &str = "MQTTLINK_STORE_PATH";

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub wake_lock: WakeLockConfig,
    #[serde(default)]
    pub keep_alive: KeepAliveConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    /// Emit trace events to the application
    #[serde(default)]
    pub trace_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file, or `:memory:`
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

/// Maximum hold of each wake guarantee
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeLockConfig {
    #[serde(default = "default_wake_timeout")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_wake_timeout")]
    pub ping_timeout_ms: u64,
    #[serde(default = "default_wake_timeout")]
    pub network_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepAliveConfig {
    /// Delay of the accelerated keep-alive after a connection loss
    #[serde(default = "default_reconnect_nudge")]
    pub reconnect_nudge_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Reachability polling interval of the network watcher
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("mqttlink.db")
}

fn default_wake_timeout() -> u64 {
    20_000
}

fn default_reconnect_nudge() -> u64 {
    100
}

fn default_poll_interval() -> u64 {
    1_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for WakeLockConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_wake_timeout(),
            ping_timeout_ms: default_wake_timeout(),
            network_timeout_ms: default_wake_timeout(),
        }
    }
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            reconnect_nudge_ms: default_reconnect_nudge(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            store: StoreConfig::default(),
            wake_lock: WakeLockConfig::default(),
            keep_alive: KeepAliveConfig::default(),
            network: NetworkConfig::default(),
            trace_enabled: false,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from YAML file
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        Self::from_yaml(&yaml_content)
    }

    /// Parse, apply environment overrides and validate
    pub fn from_yaml(yaml_content: &str) -> Result<Self> {
        let mut config: ServiceConfig = serde_yaml::from_str(yaml_content)?;

        if let Ok(path) = std::env::var(STORE_PATH_ENV) {
            info!("Overriding store path from environment variable");
            config.store.path = PathBuf::from(path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "store.path must not be empty".to_string(),
            ));
        }

        for (name, value) in [
            ("wake_lock.connect_timeout_ms", self.wake_lock.connect_timeout_ms),
            ("wake_lock.ping_timeout_ms", self.wake_lock.ping_timeout_ms),
            ("wake_lock.network_timeout_ms", self.wake_lock.network_timeout_ms),
            ("keep_alive.reconnect_nudge_ms", self.keep_alive.reconnect_nudge_ms),
            ("network.poll_interval_ms", self.network.poll_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        Ok(())
    }

    pub fn connect_wake_timeout(&self) -> Duration {
        Duration::from_millis(self.wake_lock.connect_timeout_ms)
    }

    pub fn ping_wake_timeout(&self) -> Duration {
        Duration::from_millis(self.wake_lock.ping_timeout_ms)
    }

    pub fn network_wake_timeout(&self) -> Duration {
        Duration::from_millis(self.wake_lock.network_timeout_ms)
    }

    pub fn reconnect_nudge(&self) -> Duration {
        Duration::from_millis(self.keep_alive.reconnect_nudge_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.network.poll_interval_ms)
    }

    /// Whether the store should live in memory only
    pub fn store_in_memory(&self) -> bool {
        self.store.path.as_os_str() == ":memory:"
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  Log level: {}", self.log_level);
        info!("  Store path: {}", self.store.path.display());
        info!(
            "  Wake lock timeouts: connect {} ms, ping {} ms, network {} ms",
            self.wake_lock.connect_timeout_ms,
            self.wake_lock.ping_timeout_ms,
            self.wake_lock.network_timeout_ms
        );
        info!("  Reconnect nudge: {} ms", self.keep_alive.reconnect_nudge_ms);
        info!("  Network poll interval: {} ms", self.network.poll_interval_ms);
        info!("  Trace enabled: {}", self.trace_enabled);
    }
}
