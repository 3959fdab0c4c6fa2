//! Common test utilities for mqttlink integration tests
//!
//! A scripted wire engine that records every call and lets the test fire
//! engine callbacks deterministically, plus a registry harness wired to
//! virtual time and recording collaborators.

#![allow(dead_code)]

use mqttlink::{
    Action, BufferOptions, ClientHandle, ConnectOptions, ConnectionEvent, ConnectionRegistry, EngineCallback,
    EngineError, EngineFactory, EngineResult, MemoryMessageStore, MessageListener, MessageStore, MqttEngine,
    MqttMessage, ServiceConfig, StaticConnectivity, Status, Token, TopicFilter, TrackingPowerManager,
    VirtualAlarmClock,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

pub const SERVER: &str = "tcp://broker.test:1883";

/// One recorded call into the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Connect { token: Token, clean_session: bool },
    Reconnect,
    Disconnect { token: Token, quiesce: Option<Duration> },
    Publish { token: Token, topic: String },
    Subscribe { token: Token, topics: Vec<String> },
    SubscribeWithListeners { token: Token, topics: Vec<String>, listeners: usize },
    Unsubscribe { token: Token, topics: Vec<String> },
    CheckForActivity { token: Token },
    SetBufferOptions(BufferOptions),
    DeleteBuffered(usize),
    Close,
}

/// Scripted engine
///
/// Calls only record; outcomes are delivered when the test fires them.
pub struct MockEngine {
    callback: Weak<dyn EngineCallback>,
    calls: Mutex<Vec<EngineCall>>,
    connected: AtomicBool,
    /// Every call returns a synchronous error
    pub refuse_calls: AtomicBool,
    /// check_for_activity returns false
    pub refuse_ping: AtomicBool,
    pub fail_close: AtomicBool,
    buffer: Mutex<BufferOptions>,
    buffered: Mutex<Vec<MqttMessage>>,
    in_flight: Mutex<Vec<Token>>,
}

impl MockEngine {
    fn new(callback: Weak<dyn EngineCallback>) -> Self {
        Self {
            callback,
            calls: Mutex::new(Vec::new()),
            connected: AtomicBool::new(false),
            refuse_calls: AtomicBool::new(false),
            refuse_ping: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            buffer: Mutex::new(BufferOptions::default()),
            buffered: Mutex::new(Vec::new()),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: EngineCall) -> EngineResult<()> {
        self.calls.lock().push(call);
        if self.refuse_calls.load(Ordering::SeqCst) {
            return Err(EngineError::new("engine refused").with_reason(32103));
        }
        Ok(())
    }

    fn callback(&self) -> Arc<dyn EngineCallback> {
        self.callback.upgrade().expect("connection dropped")
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, EngineCall::Connect { .. }))
            .count()
    }

    pub fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    /// Token of the most recent call matching `pred`
    pub fn last_token(&self, pred: impl Fn(&EngineCall) -> bool) -> Option<Token> {
        self.calls().into_iter().rev().find(|c| pred(c)).and_then(|c| match c {
            EngineCall::Connect { token, .. }
            | EngineCall::Disconnect { token, .. }
            | EngineCall::Publish { token, .. }
            | EngineCall::Subscribe { token, .. }
            | EngineCall::SubscribeWithListeners { token, .. }
            | EngineCall::Unsubscribe { token, .. }
            | EngineCall::CheckForActivity { token } => Some(token),
            _ => None,
        })
    }

    pub fn last_connect_token(&self) -> Token {
        self.last_token(|c| matches!(c, EngineCall::Connect { .. }))
            .expect("no connect issued")
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn buffered(&self) -> Vec<MqttMessage> {
        self.buffered.lock().clone()
    }

    // ---- firing engine callbacks ----

    pub fn complete(&self, token: Token, outcome: EngineResult<()>) {
        self.callback().action_complete(token, outcome);
    }

    /// Complete the latest connect successfully
    pub fn accept_connect(&self) {
        let token = self.last_connect_token();
        self.set_connected(true);
        self.complete(token, Ok(()));
    }

    /// Complete the latest connect with a failure
    pub fn reject_connect(&self, message: &str) {
        let token = self.last_connect_token();
        self.complete(token, Err(EngineError::new(message).with_reason(5)));
    }

    pub fn fire_connection_lost(&self, cause: &str) {
        self.set_connected(false);
        self.callback().connection_lost(Some(EngineError::new(cause)));
    }

    pub fn fire_connect_complete(&self, reconnect: bool) {
        self.set_connected(true);
        self.callback().connect_complete(reconnect, SERVER);
    }

    pub fn fire_message(&self, topic: &str, payload: &str) -> mqttlink::Result<()> {
        self.callback().message_arrived(topic, MqttMessage::new(payload))
    }

    pub fn fire_delivery(&self, token: Token) {
        self.in_flight.lock().retain(|t| *t != token);
        self.callback().delivery_complete(token);
    }
}

impl MqttEngine for MockEngine {
    fn connect(&self, options: &ConnectOptions, _context: Option<&str>, token: Token) -> EngineResult<()> {
        self.record(EngineCall::Connect {
            token,
            clean_session: options.clean_session,
        })
    }

    fn reconnect(&self) -> EngineResult<()> {
        self.record(EngineCall::Reconnect)
    }

    fn disconnect(&self, quiesce: Option<Duration>, _context: Option<&str>, token: Token) -> EngineResult<()> {
        self.record(EngineCall::Disconnect { token, quiesce })?;
        self.set_connected(false);
        Ok(())
    }

    fn publish(&self, topic: &str, message: &MqttMessage, _context: Option<&str>, token: Token) -> EngineResult<()> {
        self.record(EngineCall::Publish {
            token,
            topic: topic.to_owned(),
        })?;
        if !self.connected.load(Ordering::SeqCst) {
            self.buffered.lock().push(message.clone());
        }
        self.in_flight.lock().push(token);
        Ok(())
    }

    fn subscribe(&self, filters: &[TopicFilter], _context: Option<&str>, token: Token) -> EngineResult<()> {
        self.record(EngineCall::Subscribe {
            token,
            topics: filters.iter().map(|f| f.topic.clone()).collect(),
        })
    }

    fn subscribe_with_listeners(
        &self,
        filters: &[TopicFilter],
        listeners: Vec<Arc<dyn MessageListener>>,
        _context: Option<&str>,
        token: Token,
    ) -> EngineResult<()> {
        self.record(EngineCall::SubscribeWithListeners {
            token,
            topics: filters.iter().map(|f| f.topic.clone()).collect(),
            listeners: listeners.len(),
        })
    }

    fn unsubscribe(&self, topics: &[String], _context: Option<&str>, token: Token) -> EngineResult<()> {
        self.record(EngineCall::Unsubscribe {
            token,
            topics: topics.to_vec(),
        })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn pending_delivery_tokens(&self) -> Vec<Token> {
        self.in_flight.lock().clone()
    }

    fn check_for_activity(&self, token: Token) -> bool {
        self.calls.lock().push(EngineCall::CheckForActivity { token });
        !self.refuse_ping.load(Ordering::SeqCst)
    }

    fn set_buffer_options(&self, options: BufferOptions) {
        self.calls.lock().push(EngineCall::SetBufferOptions(options));
        *self.buffer.lock() = options;
    }

    fn buffered_message_count(&self) -> usize {
        self.buffered.lock().len()
    }

    fn buffered_message(&self, index: usize) -> Option<MqttMessage> {
        self.buffered.lock().get(index).cloned()
    }

    fn delete_buffered_message(&self, index: usize) -> EngineResult<()> {
        self.calls.lock().push(EngineCall::DeleteBuffered(index));
        let mut buffered = self.buffered.lock();
        if index >= buffered.len() {
            return Err(EngineError::new(format!("no buffered message at {}", index)));
        }
        buffered.remove(index);
        Ok(())
    }

    fn close(&self) -> EngineResult<()> {
        self.calls.lock().push(EngineCall::Close);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(EngineError::new("close failed"));
        }
        Ok(())
    }
}

/// Factory handing out [`MockEngine`]s and keeping them for inspection
#[derive(Default)]
pub struct MockEngineFactory {
    engines: Mutex<Vec<(String, Arc<MockEngine>)>>,
    pub fail_create: AtomicBool,
}

impl MockEngineFactory {
    /// Most recent engine created for `client_id`
    pub fn engine_for(&self, client_id: &str) -> Arc<MockEngine> {
        self.engines
            .lock()
            .iter()
            .rev()
            .find(|(id, _)| id == client_id)
            .map(|(_, engine)| Arc::clone(engine))
            .expect("no engine created for client")
    }

    pub fn created(&self) -> usize {
        self.engines.lock().len()
    }
}

impl EngineFactory for MockEngineFactory {
    fn create(
        &self,
        _server_uri: &str,
        client_id: &str,
        callback: Weak<dyn EngineCallback>,
    ) -> EngineResult<Arc<dyn MqttEngine>> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(EngineError::new("cannot create engine"));
        }
        let engine = Arc::new(MockEngine::new(callback));
        self.engines.lock().push((client_id.to_owned(), Arc::clone(&engine)));
        Ok(engine)
    }
}

/// Registry wired to mocks and virtual time
pub struct Harness {
    pub registry: Arc<ConnectionRegistry>,
    pub factory: Arc<MockEngineFactory>,
    pub clock: Arc<VirtualAlarmClock>,
    pub power: Arc<TrackingPowerManager>,
    pub connectivity: Arc<StaticConnectivity>,
    pub store: Arc<dyn MessageStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryMessageStore::new()))
    }

    pub fn with_store(store: Arc<dyn MessageStore>) -> Self {
        Self::build(store, ServiceConfig::default())
    }

    pub fn build(store: Arc<dyn MessageStore>, config: ServiceConfig) -> Self {
        Self::assemble(Some(store), config)
    }

    /// Registry whose Message Store is opened from `config.store.path`
    pub fn from_config(config: ServiceConfig) -> Self {
        Self::assemble(None, config)
    }

    fn assemble(store: Option<Arc<dyn MessageStore>>, config: ServiceConfig) -> Self {
        let factory = Arc::new(MockEngineFactory::default());
        let clock = Arc::new(VirtualAlarmClock::new());
        let power = Arc::new(TrackingPowerManager::new());
        let connectivity = Arc::new(StaticConnectivity::new(true));

        let mut builder = ConnectionRegistry::builder()
            .engine_factory(factory.clone())
            .power_manager(power.clone())
            .connectivity(connectivity.clone())
            .alarm_clock(clock.clone())
            .config(config);
        if let Some(store) = store {
            builder = builder.store(store);
        }
        let registry = builder.build().expect("registry builds");
        let store = registry.store();

        Self {
            registry: Arc::new(registry),
            factory,
            clock,
            power,
            connectivity,
            store,
        }
    }

    pub fn handle(&self, client_id: &str) -> ClientHandle {
        self.registry.get_or_create(SERVER, client_id, "test")
    }

    pub fn engine(&self, client_id: &str) -> Arc<MockEngine> {
        self.factory.engine_for(client_id)
    }

    /// Connect `client_id` and complete the connect; drains the events
    pub fn connected(&self, client_id: &str, options: ConnectOptions) -> (ClientHandle, Arc<MockEngine>) {
        let handle = self.handle(client_id);
        self.registry
            .connect(&handle, options, Default::default())
            .expect("known handle");
        let engine = self.engine(client_id);
        engine.accept_connect();
        self.drain();
        (handle, engine)
    }

    pub fn drain(&self) -> Vec<ConnectionEvent> {
        let events = self.registry.collect_events();
        for event in &events {
            verbose_println!("  event: {}", event.to_json());
        }
        events
    }
}

/// `(action, status)` of each event, in order
pub fn summary(events: &[ConnectionEvent]) -> Vec<(Action, Status)> {
    events.iter().map(|e| (e.action, e.status)).collect()
}

/// Topics of the MessageArrived events, in order
pub fn arrived_topics(events: &[ConnectionEvent]) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.action == Action::MessageArrived)
        .filter_map(|e| e.topic.clone())
        .collect()
}

/// Options for a persistent session without keep-alive
pub fn persistent() -> ConnectOptions {
    ConnectOptions::new().clean_session(false).keep_alive(Duration::ZERO)
}
