use crate::core::wakelock::WakeLock;
use crate::error::MqttLinkError;
use crate::manager::registry::ConnectionRegistry;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Turns network reachability changes into registry-wide reconnects
///
/// Hosts with a platform notification call
/// [`on_reachability_changed`](Self::on_reachability_changed) from it; hosts
/// without one run [`spawn_watcher`](Self::spawn_watcher), which polls the
/// registry's `Connectivity`.
pub struct NetworkMonitor {
    registry: Arc<ConnectionRegistry>,
    wake: Arc<WakeLock>,
    running: Arc<AtomicBool>,
    watcher: RwLock<Option<JoinHandle<()>>>,
}

impl NetworkMonitor {
    /// # Arguments
    /// * `wake_timeout` - maximum hold of the network-change wake guarantee
    pub fn new(registry: Arc<ConnectionRegistry>, wake_timeout: Duration) -> Arc<Self> {
        let wake = WakeLock::new("mqttlink.network", registry.power(), wake_timeout);
        Arc::new(Self {
            registry,
            wake,
            running: Arc::new(AtomicBool::new(false)),
            watcher: RwLock::new(None),
        })
    }

    /// React to a reachability change
    ///
    /// Reachable: every Connection is asked to reconnect. Unreachable: every
    /// Connection is told it is offline. Runs under the network wake lock.
    pub fn on_reachability_changed(&self) {
        let _wake = self.wake.acquire();

        if self.registry.connectivity().is_reachable() {
            info!("network reachable, reconnecting");
            match self.registry.reconnect_all() {
                Ok(()) => {}
                // dropped again between the check and the fan-out
                Err(MqttLinkError::Unreachable) => debug!("network lost again before reconnect"),
                Err(e) => warn!(error = %e, "reconnect fan-out failed"),
            }
        } else {
            info!("network unreachable, marking connections offline");
            self.registry.notify_offline();
        }
    }

    /// Poll reachability every `interval` and react to each change
    ///
    /// A second call replaces the running watcher.
    pub fn spawn_watcher(self: &Arc<Self>, interval: Duration) {
        self.stop_watcher();
        self.running.store(true, Ordering::Release);

        // weak so a dropped monitor ends the task instead of being kept alive by it
        let monitor = Arc::downgrade(self);
        let running = Arc::clone(&self.running);
        let mut last = self.registry.connectivity().is_reachable();
        let handle = tokio::spawn(async move {
            debug!("network watcher started");

            loop {
                tokio::time::sleep(interval).await;
                if !running.load(Ordering::Acquire) {
                    break;
                }
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };

                let now = monitor.registry.connectivity().is_reachable();
                if now != last {
                    last = now;
                    monitor.on_reachability_changed();
                }
            }

            debug!("network watcher stopped");
        });

        *self.watcher.write() = Some(handle);
    }

    pub fn stop_watcher(&self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.watcher.write().take() {
            handle.abort();
        }
    }

    pub fn is_watching(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.stop_watcher();
    }
}
