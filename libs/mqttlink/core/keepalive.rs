//! Keep-alive scheduler
//!
//! One recurring wake per started Connection, armed on an [`AlarmClock`]
//! under the key `keepalive:<client handle>`. Because the clock replaces an
//! earlier alarm with the same key, starting twice never yields two timers.
//!
//! On each fire the scheduler takes a guard on the shared ping wake lock and
//! hands it to the Connection's [`ActivityCheck`]. The Connection keeps the
//! guard until the engine reports the outcome of the check, or drops it at
//! once when no check could be started.

use crate::alarm::{AlarmCallback, AlarmClock};
use crate::core::message::ClientHandle;
use crate::core::wakelock::{WakeGuard, WakeLock};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace};

/// Something that can ping-if-idle on demand
pub trait ActivityCheck: Send + Sync {
    /// Start an activity check, holding `guard` until its outcome is known
    ///
    /// # Returns
    /// `false` if no check was started; the guard has then already been dropped
    fn check_for_activity(&self, guard: WakeGuard) -> bool;
}

struct Entry {
    target: Weak<dyn ActivityCheck>,
    interval: Duration,
}

pub struct KeepAliveScheduler {
    self_ref: Weak<KeepAliveScheduler>,
    clock: Arc<dyn AlarmClock>,
    wake: Arc<WakeLock>,
    entries: Mutex<HashMap<ClientHandle, Entry>>,
}

impl KeepAliveScheduler {
    pub fn new(clock: Arc<dyn AlarmClock>, wake: Arc<WakeLock>) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            clock,
            wake,
            entries: Mutex::new(HashMap::new()),
        })
    }

    /// Register the recurring wake for `handle`, replacing any earlier one
    pub fn start(&self, handle: &ClientHandle, target: Weak<dyn ActivityCheck>, interval: Duration) {
        self.entries
            .lock()
            .insert(handle.clone(), Entry { target, interval });
        debug!(handle = %handle, interval_ms = interval.as_millis() as u64, "keep-alive started");
        self.arm(handle, interval);
    }

    /// Cancel the wake for `handle`; a no-op if never started
    pub fn stop(&self, handle: &ClientHandle) {
        let mut entries = self.entries.lock();
        if entries.remove(handle).is_some() {
            debug!(handle = %handle, "keep-alive stopped");
        }
        self.clock.cancel(&Self::alarm_key(handle));
    }

    /// Move the next wake to `delay` from now
    ///
    /// Later wakes return to the registered interval.
    ///
    /// # Returns
    /// `false` if `handle` is not started
    pub fn reschedule(&self, handle: &ClientHandle, delay: Duration) -> bool {
        if !self.entries.lock().contains_key(handle) {
            return false;
        }
        debug!(handle = %handle, delay_ms = delay.as_millis() as u64, "keep-alive rescheduled");
        self.arm(handle, delay);
        true
    }

    pub fn is_started(&self, handle: &ClientHandle) -> bool {
        self.entries.lock().contains_key(handle)
    }

    /// Number of Connections with a registered wake
    pub fn active_count(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn interval_of(&self, handle: &ClientHandle) -> Option<Duration> {
        self.entries.lock().get(handle).map(|e| e.interval)
    }

    fn alarm_key(handle: &ClientHandle) -> String {
        format!("keepalive:{}", handle)
    }

    fn arm(&self, handle: &ClientHandle, delay: Duration) {
        let scheduler = self.self_ref.clone();
        let fired_for = handle.clone();
        let callback: AlarmCallback = Arc::new(move || {
            if let Some(scheduler) = scheduler.upgrade() {
                scheduler.fire(&fired_for);
            }
        });
        self.clock.set_exact(&Self::alarm_key(handle), delay, callback);
    }

    fn fire(&self, handle: &ClientHandle) {
        let target = match self.entries.lock().get(handle) {
            Some(entry) => entry.target.clone(),
            None => return,
        };

        let Some(target) = target.upgrade() else {
            debug!(handle = %handle, "keep-alive target gone, stopping");
            self.stop(handle);
            return;
        };

        let started = target.check_for_activity(self.wake.acquire());
        trace!(handle = %handle, started, "keep-alive fired");

        // stop() may have run while the check was being issued; it cancels
        // under the same lock, so checking and arming here cannot interleave
        let entries = self.entries.lock();
        if let Some(entry) = entries.get(handle) {
            self.arm(handle, entry.interval);
        }
    }
}
