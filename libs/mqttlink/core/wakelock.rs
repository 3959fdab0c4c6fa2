//! Scoped wake guarantees on top of a [`PowerManager`] tag
//!
//! A [`WakeLock`] is one shared tag ("purpose"). Each critical section takes
//! a [`WakeGuard`]; the tag is held while at least one guard is alive and
//! released when the last one drops. The power manager's `max_hold` timeout
//! is the backstop for a guard that is never dropped.

use crate::power::PowerManager;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct HoldState {
    count: usize,
    /// Bumped by `release_all`; guards from an older generation no longer count
    generation: u64,
}

pub struct WakeLock {
    tag: String,
    power: Arc<dyn PowerManager>,
    max_hold: Duration,
    state: Mutex<HoldState>,
}

impl WakeLock {
    pub fn new(tag: impl Into<String>, power: Arc<dyn PowerManager>, max_hold: Duration) -> Arc<Self> {
        Arc::new(Self {
            tag: tag.into(),
            power,
            max_hold,
            state: Mutex::new(HoldState::default()),
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Begin a critical section
    ///
    /// Every acquire re-arms the power manager's timeout, so the backstop
    /// always covers the most recent section.
    pub fn acquire(self: &Arc<Self>) -> WakeGuard {
        let mut state = self.state.lock();
        state.count += 1;
        self.power.acquire(&self.tag, self.max_hold);
        trace!(tag = %self.tag, holders = state.count, "wake lock acquired");
        WakeGuard {
            lock: Arc::clone(self),
            generation: state.generation,
        }
    }

    /// Force the tag released regardless of outstanding guards
    ///
    /// Idempotent. Guards still alive become inert.
    pub fn release_all(&self) {
        let mut state = self.state.lock();
        let had = state.count;
        state.count = 0;
        state.generation = state.generation.wrapping_add(1);
        self.power.release(&self.tag);
        if had > 0 {
            debug!(tag = %self.tag, dropped = had, "wake lock force-released");
        }
    }

    /// Number of live guards counted against the tag
    pub fn holders(&self) -> usize {
        self.state.lock().count
    }

    pub fn is_held(&self) -> bool {
        self.holders() > 0
    }

    fn release_one(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation || state.count == 0 {
            return;
        }
        state.count -= 1;
        if state.count == 0 {
            self.power.release(&self.tag);
            trace!(tag = %self.tag, "wake lock released");
        }
    }
}

impl std::fmt::Debug for WakeLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WakeLock")
            .field("tag", &self.tag)
            .field("max_hold", &self.max_hold)
            .field("holders", &self.holders())
            .finish()
    }
}

/// Releases its share of the wake lock when dropped
#[must_use = "dropping the guard ends the critical section"]
pub struct WakeGuard {
    lock: Arc<WakeLock>,
    generation: u64,
}

impl WakeGuard {
    pub fn tag(&self) -> &str {
        self.lock.tag()
    }
}

impl Drop for WakeGuard {
    fn drop(&mut self) {
        self.lock.release_one(self.generation);
    }
}

/// Power manager that records every call, for tests and diagnostics
///
/// Holds expire lazily: `is_held` reports `false` once `max_hold` has passed
/// since the last acquire, mirroring a platform timeout.
#[derive(Debug, Default)]
pub struct TrackingPowerManager {
    inner: Mutex<Tracking>,
}

#[derive(Debug, Default)]
struct Tracking {
    deadlines: HashMap<String, Instant>,
    acquires: HashMap<String, usize>,
    releases: HashMap<String, usize>,
}

impl TrackingPowerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire_count(&self, tag: &str) -> usize {
        self.inner.lock().acquires.get(tag).copied().unwrap_or(0)
    }

    pub fn release_count(&self, tag: &str) -> usize {
        self.inner.lock().releases.get(tag).copied().unwrap_or(0)
    }

    /// Tags currently held, sorted
    pub fn held_tags(&self) -> Vec<String> {
        let now = Instant::now();
        let inner = self.inner.lock();
        let mut tags: Vec<String> = inner
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline > now)
            .map(|(tag, _)| tag.clone())
            .collect();
        tags.sort();
        tags
    }
}

impl PowerManager for TrackingPowerManager {
    fn acquire(&self, tag: &str, max_hold: Duration) {
        let mut inner = self.inner.lock();
        inner.deadlines.insert(tag.to_owned(), Instant::now() + max_hold);
        *inner.acquires.entry(tag.to_owned()).or_default() += 1;
    }

    fn release(&self, tag: &str) {
        let mut inner = self.inner.lock();
        if inner.deadlines.remove(tag).is_some() {
            *inner.releases.entry(tag.to_owned()).or_default() += 1;
        }
    }

    fn is_held(&self, tag: &str) -> bool {
        self.inner
            .lock()
            .deadlines
            .get(tag)
            .is_some_and(|deadline| *deadline > Instant::now())
    }
}
