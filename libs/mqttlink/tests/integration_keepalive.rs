//! Integration tests for the keep-alive timer and its wake guarantees

mod common;

use common::*;
use mqttlink::{ConnectOptions, EventContext};
use std::sync::atomic::Ordering;
use std::time::Duration;

const PING_TAG: &str = "mqttlink.ping";
const INTERVAL: Duration = Duration::from_secs(30);

fn alarm_key(handle: &mqttlink::ClientHandle) -> String {
    format!("keepalive:{}", handle)
}

fn is_ping(call: &EngineCall) -> bool {
    matches!(call, EngineCall::CheckForActivity { .. })
}

#[test]
fn test_single_timer_after_repeated_connects() {
    let h = Harness::new();
    let options = persistent().keep_alive(INTERVAL);
    let (handle, engine) = h.connected("dev", options.clone());

    // already connected: success is synthesized and the timer re-registered
    h.registry.connect(&handle, options, EventContext::default()).unwrap();
    h.drain();

    assert_eq!(h.registry.keep_alive().active_count(), 1);
    assert_eq!(h.clock.deadline_of(&alarm_key(&handle)), Some(INTERVAL));

    assert_eq!(h.clock.advance(INTERVAL), 1);
    assert_eq!(engine.count(is_ping), 1);
}

#[test]
fn test_timer_recurs_at_interval() {
    let h = Harness::new();
    let (handle, engine) = h.connected("dev", persistent().keep_alive(INTERVAL));

    h.clock.advance(INTERVAL);
    let token = engine.last_token(is_ping).unwrap();
    engine.complete(token, Ok(()));
    h.clock.advance(INTERVAL);

    assert_eq!(engine.count(is_ping), 2);
    assert_eq!(h.clock.deadline_of(&alarm_key(&handle)), Some(INTERVAL * 3));
}

#[test]
fn test_ping_holds_wake_until_completion() {
    verbose_println!("Testing ping wake guarantee...");
    let h = Harness::new();
    let (_handle, engine) = h.connected("dev", persistent().keep_alive(INTERVAL));

    h.clock.advance(INTERVAL);

    assert_eq!(h.power.acquire_count(PING_TAG), 1);
    assert!(h.power.held_tags().contains(&PING_TAG.to_string()));

    let token = engine.last_token(is_ping).unwrap();
    engine.complete(token, Ok(()));

    assert!(!h.power.held_tags().contains(&PING_TAG.to_string()));
    assert_eq!(h.power.release_count(PING_TAG), 1);
}

#[test]
fn test_failed_ping_completion_releases_wake() {
    let h = Harness::new();
    let (_handle, engine) = h.connected("dev", persistent().keep_alive(INTERVAL));

    h.clock.advance(INTERVAL);
    let token = engine.last_token(is_ping).unwrap();
    engine.complete(token, Err(mqttlink::EngineError::new("no PINGRESP")));

    assert!(!h.power.held_tags().contains(&PING_TAG.to_string()));
    assert!(h.drain().is_empty(), "ping outcomes are not reported as events");
}

#[test]
fn test_refused_ping_releases_wake_immediately() {
    let h = Harness::new();
    let (handle, engine) = h.connected("dev", persistent().keep_alive(INTERVAL));
    engine.refuse_ping.store(true, Ordering::SeqCst);

    h.clock.advance(INTERVAL);

    assert_eq!(engine.count(is_ping), 1);
    assert_eq!(h.power.acquire_count(PING_TAG), 1);
    assert_eq!(h.power.release_count(PING_TAG), 1);
    assert!(h.power.held_tags().is_empty());
    // still armed for the next round
    assert!(h.clock.deadline_of(&alarm_key(&handle)).is_some());
}

#[test]
fn test_disconnect_cancels_timer() {
    let h = Harness::new();
    let (handle, engine) = h.connected("dev", persistent().keep_alive(INTERVAL));

    h.registry.disconnect(&handle, EventContext::default()).unwrap();

    assert_eq!(h.registry.keep_alive().active_count(), 0);
    assert!(h.clock.deadline_of(&alarm_key(&handle)).is_none());
    assert_eq!(h.clock.advance(INTERVAL * 4), 0);
    assert_eq!(engine.count(is_ping), 0);
}

#[test]
fn test_zero_interval_never_starts_timer() {
    let h = Harness::new();
    let (handle, _engine) = h.connected("dev", ConnectOptions::new().keep_alive(Duration::ZERO));

    assert!(!h.registry.keep_alive().is_started(&handle));
    assert!(h.clock.deadline_of(&alarm_key(&handle)).is_none());
}

#[test]
fn test_timers_are_per_connection() {
    let h = Harness::new();
    let (a, engine_a) = h.connected("a", persistent().keep_alive(INTERVAL));
    let (b, engine_b) = h.connected("b", persistent().keep_alive(INTERVAL * 2));

    assert_eq!(h.registry.keep_alive().interval_of(&a), Some(INTERVAL));
    assert_eq!(h.registry.keep_alive().interval_of(&b), Some(INTERVAL * 2));

    h.clock.advance(INTERVAL);
    assert_eq!(engine_a.count(is_ping), 1);
    assert_eq!(engine_b.count(is_ping), 0);

    h.registry.close(&a).unwrap();
    h.clock.advance(INTERVAL);
    assert_eq!(engine_a.count(is_ping), 1);
    assert_eq!(engine_b.count(is_ping), 1);
}

#[test]
fn test_close_drops_outstanding_ping_guard() {
    let h = Harness::new();
    let (handle, _engine) = h.connected("dev", persistent().keep_alive(INTERVAL));

    h.clock.advance(INTERVAL);
    assert!(h.power.held_tags().contains(&PING_TAG.to_string()));

    h.registry.close(&handle).unwrap();

    assert!(!h.power.held_tags().contains(&PING_TAG.to_string()));
}
