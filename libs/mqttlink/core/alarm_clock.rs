//! [`AlarmClock`] implementations
//!
//! - [`TokioAlarmClock`]: one sleeping tokio task per armed key
//! - [`VirtualAlarmClock`]: deterministic virtual time driven by `advance`

use crate::alarm::{AlarmCallback, AlarmClock};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

/// Alarm clock backed by the tokio timer
///
/// Suitable for hosts that are never suspended. A host with doze-style
/// suspension plugs in its own wake-capable [`AlarmClock`] instead.
pub struct TokioAlarmClock {
    runtime: Handle,
    alarms: Arc<Mutex<HashMap<String, (u64, JoinHandle<()>)>>>,
    next_id: AtomicU64,
}

impl TokioAlarmClock {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            alarms: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Bind to the runtime of the calling context, if there is one
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl AlarmClock for TokioAlarmClock {
    fn set_exact(&self, key: &str, delay: Duration, callback: AlarmCallback) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let alarms = Arc::clone(&self.alarms);
        let owned_key = key.to_owned();

        // Hold the map lock across spawn so the task cannot look itself up
        // before it is registered
        let mut map = self.alarms.lock();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut map = alarms.lock();
                match map.get(&owned_key) {
                    Some((current, _)) if *current == id => {
                        map.remove(&owned_key);
                    }
                    _ => return,
                }
            }
            trace!(key = %owned_key, "alarm fired");
            callback();
        });
        if let Some((_, previous)) = map.insert(key.to_owned(), (id, task)) {
            previous.abort();
        }
    }

    fn cancel(&self, key: &str) {
        if let Some((_, task)) = self.alarms.lock().remove(key) {
            task.abort();
        }
    }

    fn armed_count(&self) -> usize {
        self.alarms.lock().len()
    }
}

impl Drop for TokioAlarmClock {
    fn drop(&mut self) {
        for (_, (_, task)) in self.alarms.lock().drain() {
            task.abort();
        }
    }
}

struct VirtualAlarm {
    deadline: Duration,
    seq: u64,
    callback: AlarmCallback,
}

#[derive(Default)]
struct VirtualState {
    now: Duration,
    seq: u64,
    alarms: HashMap<String, VirtualAlarm>,
}

/// Alarm clock over virtual time
///
/// Nothing fires until [`advance`](Self::advance) is called. Alarms due in
/// the advanced window run in deadline order (ties in registration order),
/// outside the internal lock, so callbacks may re-arm or cancel.
#[derive(Default)]
pub struct VirtualAlarmClock {
    state: Mutex<VirtualState>,
}

impl VirtualAlarmClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Absolute virtual time at which `key` fires, if armed
    pub fn deadline_of(&self, key: &str) -> Option<Duration> {
        self.state.lock().alarms.get(key).map(|a| a.deadline)
    }

    /// Move virtual time forward, running every alarm that comes due
    ///
    /// # Returns
    /// Number of callbacks run
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now + by;
        let mut fired = 0;

        loop {
            let callback = {
                let mut state = self.state.lock();
                let next = state
                    .alarms
                    .iter()
                    .filter(|(_, alarm)| alarm.deadline <= target)
                    .min_by_key(|(_, alarm)| (alarm.deadline, alarm.seq))
                    .map(|(key, _)| key.clone());

                match next.and_then(|key| state.alarms.remove(&key)) {
                    Some(alarm) => {
                        state.now = state.now.max(alarm.deadline);
                        alarm.callback
                    }
                    None => {
                        state.now = target;
                        break;
                    }
                }
            };
            callback();
            fired += 1;
        }

        fired
    }
}

impl AlarmClock for VirtualAlarmClock {
    fn set_exact(&self, key: &str, delay: Duration, callback: AlarmCallback) {
        let mut state = self.state.lock();
        state.seq += 1;
        let alarm = VirtualAlarm {
            deadline: state.now + delay,
            seq: state.seq,
            callback,
        };
        state.alarms.insert(key.to_owned(), alarm);
    }

    fn cancel(&self, key: &str) {
        self.state.lock().alarms.remove(key);
    }

    fn armed_count(&self) -> usize {
        self.state.lock().alarms.len()
    }
}
