use std::time::Duration;

/// Platform power-management primitive
///
/// An acquired tag keeps the CPU awake until it is released or `max_hold`
/// elapses, whichever comes first. The timeout is the backstop against a
/// release that never happens (e.g. an engine callback that never fires).
pub trait PowerManager: Send + Sync {
    /// Acquire (or re-arm) the wake guarantee named `tag`
    fn acquire(&self, tag: &str, max_hold: Duration);

    /// Release the wake guarantee named `tag`; a no-op when not held
    fn release(&self, tag: &str);

    /// Whether `tag` currently keeps the device awake
    fn is_held(&self, tag: &str) -> bool;
}

/// Power manager for hosts that never suspend the process
pub struct NoopPowerManager;

impl PowerManager for NoopPowerManager {
    fn acquire(&self, _tag: &str, _max_hold: Duration) {}

    fn release(&self, _tag: &str) {}

    fn is_held(&self, _tag: &str) -> bool {
        false
    }
}
