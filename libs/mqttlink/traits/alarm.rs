use std::sync::Arc;
use std::time::Duration;

/// Callback run when an alarm fires
pub type AlarmCallback = Arc<dyn Fn() + Send + Sync>;

/// Wake-capable timer
///
/// Implementations must fire even if the host process was suspended in
/// the meantime (on a host with doze-style suspension this means an exact,
/// wake-from-idle OS alarm). Alarms are identified by key; registering a
/// key again replaces its pending alarm, so at most one alarm per key is
/// ever armed.
pub trait AlarmClock: Send + Sync {
    /// Arm (or re-arm) the alarm `key` to fire once after `delay`
    fn set_exact(&self, key: &str, delay: Duration, callback: AlarmCallback);

    /// Disarm the alarm `key`; a no-op when nothing is armed
    fn cancel(&self, key: &str);

    /// Number of alarms currently armed
    fn armed_count(&self) -> usize;
}
