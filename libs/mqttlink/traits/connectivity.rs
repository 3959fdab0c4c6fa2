use std::sync::atomic::{AtomicBool, Ordering};

/// Reports whether the network is currently usable
pub trait Connectivity: Send + Sync {
    fn is_reachable(&self) -> bool;
}

/// Connectivity driven by an atomic flag
///
/// Hosts that learn about reachability from an external signal flip the
/// flag and then notify the `NetworkMonitor`.
#[derive(Debug)]
pub struct StaticConnectivity {
    reachable: AtomicBool,
}

impl StaticConnectivity {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable: AtomicBool::new(reachable),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Release);
    }
}

impl Default for StaticConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for StaticConnectivity {
    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Acquire)
    }
}
