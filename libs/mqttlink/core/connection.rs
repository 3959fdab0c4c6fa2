//! One logical MQTT client: the lifecycle state machine around a single
//! wire-engine handle.
//!
//! Three event sources meet here: application commands (through the
//! registry), engine callbacks (on engine threads) and keep-alive fires (on
//! the alarm clock's thread). Shared state is therefore held in atomics and
//! short parking_lot critical sections; no lock is held across an engine call
//! or an event emission.
//!
//! # Correlation
//!
//! Every asynchronous engine call gets a [`Token`] minted here and recorded
//! as a pending action *before* the call is issued. The engine echoes the
//! token in [`EngineCallback::action_complete`], which turns the pending
//! action into exactly one terminal event.

use crate::core::connection_state::{AtomicConnectionState, ConnectionState};
use crate::core::event::{Action, ConnectionEvent, EventContext, EventSink, TraceHandler};
use crate::core::keepalive::{ActivityCheck, KeepAliveScheduler};
use crate::core::message::{ClientHandle, MqttMessage, TopicFilter};
use crate::core::options::{BufferOptions, ConnectOptions};
use crate::core::wakelock::{WakeGuard, WakeLock};
use crate::connectivity::Connectivity;
use crate::engine::{EngineCallback, EngineFactory, MessageListener, MqttEngine, Token};
use crate::error::{EngineError, EngineResult, MqttLinkError, Result};
use crate::power::PowerManager;
use crate::store::MessageStore;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

const TAG: &str = "Connection";

/// Collaborators shared by every Connection of one registry
#[derive(Clone)]
pub struct Collaborators {
    pub factory: Arc<dyn EngineFactory>,
    pub store: Arc<dyn MessageStore>,
    pub power: Arc<dyn PowerManager>,
    pub connectivity: Arc<dyn Connectivity>,
    pub keep_alive: Arc<KeepAliveScheduler>,
    pub sink: EventSink,
    pub tracer: Arc<TraceHandler>,
    /// Maximum hold of the connect-sequence wake guarantee
    pub connect_wake_timeout: Duration,
    /// Keep-alive delay after a connection loss with engine auto-reconnect
    pub reconnect_nudge: Duration,
}

/// What a completion token stands for
enum PendingAction {
    Connect { ctx: EventContext, reconnect: bool },
    /// `pin` keeps an evicted Connection alive until its disconnect completes
    Disconnect { ctx: EventContext, pin: Option<Arc<Connection>> },
    Send { ctx: EventContext },
    Subscribe { ctx: EventContext },
    Unsubscribe { ctx: EventContext },
    /// Keep-alive activity check; dropping the guard ends the ping section
    Ping(WakeGuard),
    /// Best-effort call whose outcome nobody waits for
    Silent,
}

/// Metadata of an in-flight publish, keyed by its delivery token
#[derive(Debug, Clone)]
struct PendingSend {
    topic: String,
    message: MqttMessage,
    ctx: EventContext,
}

/// Settings of the last connect request, reused by reconnect
#[derive(Debug, Default)]
struct Session {
    options: Option<ConnectOptions>,
    /// Correlation of the connect that reconnects are attributed to
    reconnect_ctx: EventContext,
    buffer: BufferOptions,
}

pub struct Connection {
    handle: ClientHandle,
    server_uri: String,
    client_id: String,
    self_ref: Weak<Connection>,
    deps: Collaborators,

    /// Created lazily on first connect; at most one per Connection
    engine: RwLock<Option<Arc<dyn MqttEngine>>>,
    state: AtomicConnectionState,
    /// Mutual exclusion for connect attempts, not just a status bit
    connecting: AtomicBool,
    disconnected: AtomicBool,
    clean_session: AtomicBool,
    session: Mutex<Session>,
    /// Held for the duration of one reconnect; contenders return at once
    reconnect_lock: Mutex<()>,

    next_token: AtomicU64,
    pending_actions: Mutex<HashMap<Token, PendingAction>>,
    pending_sends: Mutex<HashMap<Token, PendingSend>>,

    wake: Arc<WakeLock>,
}

impl Connection {
    pub fn new(server_uri: &str, client_id: &str, context_id: &str, deps: Collaborators) -> Arc<Self> {
        let handle = ClientHandle::new(server_uri, client_id, context_id);
        let wake = WakeLock::new(
            format!("mqttlink.connect:{}", handle),
            Arc::clone(&deps.power),
            deps.connect_wake_timeout,
        );
        Arc::new_cyclic(|self_ref| Self {
            handle,
            server_uri: server_uri.to_owned(),
            client_id: client_id.to_owned(),
            self_ref: self_ref.clone(),
            deps,
            engine: RwLock::new(None),
            state: AtomicConnectionState::new(ConnectionState::Disconnected),
            connecting: AtomicBool::new(false),
            disconnected: AtomicBool::new(true),
            clean_session: AtomicBool::new(true),
            session: Mutex::new(Session::default()),
            reconnect_lock: Mutex::new(()),
            next_token: AtomicU64::new(1),
            pending_actions: Mutex::new(HashMap::new()),
            pending_sends: Mutex::new(HashMap::new()),
            wake,
        })
    }

    pub fn handle(&self) -> &ClientHandle {
        &self.handle
    }

    pub fn server_uri(&self) -> &str {
        &self.server_uri
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting.load(Ordering::Acquire)
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Acquire)
    }

    pub fn is_clean_session(&self) -> bool {
        self.clean_session.load(Ordering::Acquire)
    }

    /// Whether the engine exists and reports connected
    pub fn is_connected(&self) -> bool {
        self.engine().is_some_and(|engine| engine.is_connected())
    }

    /// Connect with `options`
    ///
    /// A no-op while another connect is in flight. When the engine already
    /// reports connected, success is synthesized without a network call.
    pub fn connect(&self, options: ConnectOptions, ctx: EventContext) {
        if self.is_connecting() {
            debug!(handle = %self.handle, "connect already in flight, ignoring");
            return;
        }
        self.deps.tracer.debug(TAG, &format!("connect {} clean_session={}", self.handle, options.clean_session));

        {
            let mut session = self.session.lock();
            session.options = Some(options.clone());
            session.reconnect_ctx = ctx.clone();
        }
        self.clean_session.store(options.clean_session, Ordering::Release);
        if options.clean_session {
            self.purge_backlog();
        }

        if self.is_connected() {
            debug!(handle = %self.handle, "already connected, synthesizing success");
            self.after_connect_success(&ctx);
            return;
        }

        self.start_connect(&options, ctx, false);
    }

    /// Ask for a reconnect after network recovery
    ///
    /// Single-flight: a call that finds another one running returns at once.
    pub fn reconnect(&self) {
        let Some(_running) = self.reconnect_lock.try_lock() else {
            debug!(handle = %self.handle, "reconnect already running, ignoring");
            return;
        };

        let Some(engine) = self.engine() else {
            debug!(handle = %self.handle, "reconnect without engine, ignoring");
            return;
        };
        if self.is_connecting() {
            debug!(handle = %self.handle, "connect in flight, not reconnecting");
            return;
        }
        if !self.deps.connectivity.is_reachable() {
            self.deps.tracer.debug(TAG, "network not reachable, not reconnecting");
            return;
        }

        // the caller's invocation context does not carry over to reconnects
        let (options, ctx) = {
            let session = self.session.lock();
            match session.options.clone() {
                Some(options) => (
                    options,
                    EventContext {
                        activity_token: session.reconnect_ctx.activity_token.clone(),
                        invocation_context: None,
                    },
                ),
                None => return,
            }
        };

        if options.automatic_reconnect {
            info!(handle = %self.handle, "requesting engine automatic reconnect");
            if self.is_disconnected() {
                self.state.transition(ConnectionState::Reconnecting);
            }
            if let Err(e) = engine.reconnect() {
                self.emit_error(Action::Connect, &ctx, &e.into());
            }
        } else if self.is_disconnected() && !self.is_clean_session() {
            info!(handle = %self.handle, "re-issuing connect");
            self.start_connect(&options, ctx, true);
        }
    }

    /// Disconnect, waiting at most `quiesce` for in-flight work when given
    pub fn disconnect(&self, quiesce: Option<Duration>, ctx: EventContext) {
        self.disconnected.store(true, Ordering::Release);
        self.deps.tracer.debug(TAG, &format!("disconnect {}", self.handle));

        match self.engine() {
            Some(engine) if engine.is_connected() => {
                let token = self.register(PendingAction::Disconnect {
                    ctx: ctx.clone(),
                    pin: self.self_ref.upgrade(),
                });
                if let Err(e) = engine.disconnect(quiesce, ctx.invocation_context.as_deref(), token) {
                    self.pending_actions.lock().remove(&token);
                    self.emit_error(Action::Disconnect, &ctx, &e.into());
                }
            }
            _ => {
                self.deps.tracer.error(TAG, "disconnect: not connected");
                self.emit_error(Action::Disconnect, &ctx, &MqttLinkError::NotConnected);
            }
        }

        self.state.transition(ConnectionState::Disconnected);
        if self.is_clean_session() {
            self.purge_backlog();
        }
        self.deps.keep_alive.stop(&self.handle);
        self.wake.release_all();
    }

    /// Close the engine handle; the Connection is unusable afterwards
    pub fn close(&self) {
        self.deps.tracer.debug(TAG, &format!("close {}", self.handle));
        self.deps.keep_alive.stop(&self.handle);

        let engine = self.engine.write().take();
        if let Some(engine) = engine {
            if let Err(e) = engine.close() {
                let err = MqttLinkError::from(e);
                self.deps.tracer.exception(TAG, "close", &err);
                self.emit_error(Action::Close, &EventContext::default(), &err);
            }
        }

        self.state.set(ConnectionState::Closed);
        self.connecting.store(false, Ordering::Release);
        self.disconnected.store(true, Ordering::Release);
        // drops any ping guards still waiting on a completion
        self.pending_actions.lock().clear();
        self.wake.release_all();
    }

    /// Network went away
    pub fn offline(&self) {
        if !self.is_disconnected() && !self.is_clean_session() {
            self.connection_lost(Some(EngineError::new("network offline")));
        }
    }

    /// Publish `message` on `topic`
    ///
    /// Requires a connected engine, or an engine with the offline buffer
    /// enabled. Otherwise a `NotConnected` error event is emitted.
    ///
    /// # Returns
    /// The delivery token, or `None` if the publish was not handed off
    pub fn publish(&self, topic: &str, message: MqttMessage, ctx: EventContext) -> Option<Token> {
        let buffered = self.session.lock().buffer.buffer_enabled;
        let engine = match self.engine() {
            Some(engine) if engine.is_connected() || buffered => engine,
            _ => {
                self.deps.tracer.error(TAG, "publish: not connected");
                self.emit_error(Action::Send, &ctx, &MqttLinkError::NotConnected);
                return None;
            }
        };

        let token = self.register(PendingAction::Send { ctx: ctx.clone() });
        self.pending_sends.lock().insert(
            token,
            PendingSend {
                topic: topic.to_owned(),
                message: message.clone(),
                ctx: ctx.clone(),
            },
        );

        match engine.publish(topic, &message, ctx.invocation_context.as_deref(), token) {
            Ok(()) => Some(token),
            Err(e) => {
                self.pending_actions.lock().remove(&token);
                self.pending_sends.lock().remove(&token);
                self.emit_error(Action::Send, &ctx, &e.into());
                None
            }
        }
    }

    pub fn subscribe(&self, filters: &[TopicFilter], ctx: EventContext) {
        let Some(engine) = self.connected_engine(Action::Subscribe, &ctx) else {
            return;
        };
        let token = self.register(PendingAction::Subscribe { ctx: ctx.clone() });
        let outcome = engine.subscribe(filters, ctx.invocation_context.as_deref(), token);
        self.settle_sync_failure(token, Action::Subscribe, &ctx, outcome);
    }

    /// Subscribe with one listener per filter
    pub fn subscribe_with_listeners(
        &self,
        filters: &[TopicFilter],
        listeners: Vec<Arc<dyn MessageListener>>,
        ctx: EventContext,
    ) {
        let Some(engine) = self.connected_engine(Action::Subscribe, &ctx) else {
            return;
        };
        let token = self.register(PendingAction::Subscribe { ctx: ctx.clone() });
        let outcome = engine.subscribe_with_listeners(filters, listeners, ctx.invocation_context.as_deref(), token);
        self.settle_sync_failure(token, Action::Subscribe, &ctx, outcome);
    }

    pub fn unsubscribe(&self, topics: &[String], ctx: EventContext) {
        let Some(engine) = self.connected_engine(Action::Unsubscribe, &ctx) else {
            return;
        };
        let token = self.register(PendingAction::Unsubscribe { ctx: ctx.clone() });
        let outcome = engine.unsubscribe(topics, ctx.invocation_context.as_deref(), token);
        self.settle_sync_failure(token, Action::Unsubscribe, &ctx, outcome);
    }

    /// Delivery tokens of publishes the engine has not confirmed yet
    pub fn pending_delivery_tokens(&self) -> Vec<Token> {
        self.engine()
            .map(|engine| engine.pending_delivery_tokens())
            .unwrap_or_default()
    }

    pub fn set_buffer_options(&self, options: BufferOptions) -> Result<()> {
        let engine = self.require_engine()?;
        engine.set_buffer_options(options);
        self.session.lock().buffer = options;
        Ok(())
    }

    pub fn buffer_options(&self) -> BufferOptions {
        self.session.lock().buffer
    }

    pub fn buffered_message_count(&self) -> Result<usize> {
        Ok(self.require_engine()?.buffered_message_count())
    }

    pub fn buffered_message(&self, index: usize) -> Result<Option<MqttMessage>> {
        Ok(self.require_engine()?.buffered_message(index))
    }

    pub fn delete_buffered_message(&self, index: usize) -> Result<()> {
        self.require_engine()?.delete_buffered_message(index)?;
        Ok(())
    }

    /// Number of publishes awaiting delivery confirmation
    pub fn pending_send_count(&self) -> usize {
        self.pending_sends.lock().len()
    }

    // ------------------------------------------------------------------
    // internals
    // ------------------------------------------------------------------

    fn engine(&self) -> Option<Arc<dyn MqttEngine>> {
        self.engine.read().clone()
    }

    fn require_engine(&self) -> Result<Arc<dyn MqttEngine>> {
        self.engine()
            .ok_or_else(|| MqttLinkError::NotInitialized(self.handle.to_string()))
    }

    fn ensure_engine(&self) -> Result<Arc<dyn MqttEngine>> {
        if let Some(engine) = self.engine() {
            return Ok(engine);
        }
        let mut slot = self.engine.write();
        if let Some(engine) = slot.as_ref() {
            return Ok(Arc::clone(engine));
        }
        let callback: Weak<dyn EngineCallback> = self.self_ref.clone();
        let engine = self.deps.factory.create(&self.server_uri, &self.client_id, callback)?;
        debug!(handle = %self.handle, "engine created");
        *slot = Some(Arc::clone(&engine));
        Ok(engine)
    }

    fn connected_engine(&self, action: Action, ctx: &EventContext) -> Option<Arc<dyn MqttEngine>> {
        match self.engine() {
            Some(engine) if engine.is_connected() => Some(engine),
            _ => {
                self.deps.tracer.error(TAG, &format!("{:?}: not connected", action));
                self.emit_error(action, ctx, &MqttLinkError::NotConnected);
                None
            }
        }
    }

    fn next_token(&self) -> Token {
        self.next_token.fetch_add(1, Ordering::Relaxed)
    }

    fn register(&self, action: PendingAction) -> Token {
        let token = self.next_token();
        self.pending_actions.lock().insert(token, action);
        token
    }

    /// A call the engine refused never completes; report it now
    fn settle_sync_failure(&self, token: Token, action: Action, ctx: &EventContext, outcome: EngineResult<()>) {
        if let Err(e) = outcome {
            self.pending_actions.lock().remove(&token);
            self.emit_error(action, ctx, &e.into());
        }
    }

    fn start_connect(&self, options: &ConnectOptions, ctx: EventContext, reconnect: bool) {
        if self
            .connecting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(handle = %self.handle, "lost connect race, ignoring");
            return;
        }
        self.state.transition(if reconnect {
            ConnectionState::Reconnecting
        } else {
            ConnectionState::Connecting
        });

        let engine = match self.ensure_engine() {
            Ok(engine) => engine,
            Err(e) => {
                self.after_connect_failure(&ctx, &e);
                return;
            }
        };

        let token = self.register(PendingAction::Connect { ctx: ctx.clone(), reconnect });
        if let Err(e) = engine.connect(options, ctx.invocation_context.as_deref(), token) {
            self.pending_actions.lock().remove(&token);
            self.after_connect_failure(&ctx, &e.into());
        }
    }

    fn after_connect_success(&self, ctx: &EventContext) {
        let _wake = self.wake.acquire();
        self.deliver_backlog();
        self.emit(ConnectionEvent::ok(&self.handle, Action::Connect).with_context(ctx));
        self.connecting.store(false, Ordering::Release);
        self.disconnected.store(false, Ordering::Release);
        self.state.transition(ConnectionState::Connected);
        self.start_keep_alive();
        info!(handle = %self.handle, "connected");
    }

    fn after_connect_failure(&self, ctx: &EventContext, err: &MqttLinkError) {
        let _wake = self.wake.acquire();
        self.disconnected.store(true, Ordering::Release);
        self.connecting.store(false, Ordering::Release);
        self.state.transition(ConnectionState::Disconnected);
        warn!(handle = %self.handle, error = %err, "connect failed");
        self.emit_error(Action::Connect, ctx, err);
    }

    fn start_keep_alive(&self) {
        let interval = self
            .session
            .lock()
            .options
            .as_ref()
            .map(|o| o.keep_alive)
            .unwrap_or_default();
        if interval.is_zero() {
            return;
        }
        let target: Weak<dyn ActivityCheck> = self.self_ref.clone();
        self.deps.keep_alive.start(&self.handle, target, interval);
    }

    /// Re-emit every stored message for this handle, oldest first
    fn deliver_backlog(&self) {
        match self.deps.store.all_arrived(&self.handle) {
            Ok(backlog) => {
                if !backlog.is_empty() {
                    debug!(handle = %self.handle, count = backlog.len(), "redelivering backlog");
                }
                for stored in backlog {
                    self.emit(
                        ConnectionEvent::ok(&self.handle, Action::MessageArrived).with_message(
                            Some(stored.message_id),
                            &stored.topic,
                            stored.message,
                        ),
                    );
                }
            }
            Err(e) => {
                self.deps.tracer.exception(TAG, "backlog read failed", &e.into());
            }
        }
    }

    fn purge_backlog(&self) {
        match self.deps.store.clear_arrived(&self.handle) {
            Ok(0) => {}
            Ok(n) => debug!(handle = %self.handle, purged = n, "clean session purge"),
            Err(e) => self.deps.tracer.exception(TAG, "clean session purge failed", &e.into()),
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        self.deps.sink.emit(event);
    }

    fn emit_error(&self, action: Action, ctx: &EventContext, err: &MqttLinkError) {
        self.emit(ConnectionEvent::error(&self.handle, action, err).with_context(ctx));
    }
}

impl EngineCallback for Connection {
    fn action_complete(&self, token: Token, outcome: EngineResult<()>) {
        let Some(action) = self.pending_actions.lock().remove(&token) else {
            debug!(handle = %self.handle, token, "completion for unknown token");
            return;
        };

        match (action, outcome) {
            (PendingAction::Connect { ctx, .. }, Ok(())) => self.after_connect_success(&ctx),
            (PendingAction::Connect { ctx, reconnect }, Err(e)) => {
                debug!(handle = %self.handle, reconnect, "connect completion failed");
                self.after_connect_failure(&ctx, &e.into());
            }
            (PendingAction::Disconnect { ctx, .. }, Ok(())) => {
                self.emit(ConnectionEvent::ok(&self.handle, Action::Disconnect).with_context(&ctx));
            }
            (PendingAction::Disconnect { ctx, .. }, Err(e)) => self.emit_error(Action::Disconnect, &ctx, &e.into()),
            (PendingAction::Send { ctx }, Ok(())) => {
                self.emit(ConnectionEvent::ok(&self.handle, Action::Send).with_context(&ctx));
            }
            (PendingAction::Send { ctx }, Err(e)) => {
                self.pending_sends.lock().remove(&token);
                self.emit_error(Action::Send, &ctx, &e.into());
            }
            (PendingAction::Subscribe { ctx }, Ok(())) => {
                self.emit(ConnectionEvent::ok(&self.handle, Action::Subscribe).with_context(&ctx));
            }
            (PendingAction::Subscribe { ctx }, Err(e)) => self.emit_error(Action::Subscribe, &ctx, &e.into()),
            (PendingAction::Unsubscribe { ctx }, Ok(())) => {
                self.emit(ConnectionEvent::ok(&self.handle, Action::Unsubscribe).with_context(&ctx));
            }
            (PendingAction::Unsubscribe { ctx }, Err(e)) => self.emit_error(Action::Unsubscribe, &ctx, &e.into()),
            (PendingAction::Ping(_guard), outcome) => {
                if let Err(e) = outcome {
                    debug!(handle = %self.handle, error = %e, "activity check failed");
                }
            }
            (PendingAction::Silent, _) => {}
        }
    }

    fn connect_complete(&self, reconnect: bool, server_uri: &str) {
        if reconnect && !self.state.is_closed() {
            let _wake = self.wake.acquire();
            self.connecting.store(false, Ordering::Release);
            self.disconnected.store(false, Ordering::Release);
            self.state.transition(ConnectionState::Connected);
            self.deliver_backlog();
            self.start_keep_alive();
            info!(handle = %self.handle, "engine reconnected");
        }

        let mut event = ConnectionEvent::ok(&self.handle, Action::ConnectExtended);
        event.reconnect = Some(reconnect);
        event.server_uri = Some(server_uri.to_owned());
        self.emit(event);
    }

    fn connection_lost(&self, cause: Option<EngineError>) {
        warn!(handle = %self.handle, cause = ?cause, "connection lost");
        self.disconnected.store(true, Ordering::Release);

        let auto_reconnect = self
            .session
            .lock()
            .options
            .as_ref()
            .is_some_and(|o| o.automatic_reconnect);

        if auto_reconnect {
            self.state.transition(ConnectionState::Reconnecting);
            self.deps.keep_alive.reschedule(&self.handle, self.deps.reconnect_nudge);
        } else {
            self.state.transition(ConnectionState::Disconnected);
            if let Some(engine) = self.engine() {
                let token = self.register(PendingAction::Silent);
                if engine.disconnect(None, None, token).is_err() {
                    self.pending_actions.lock().remove(&token);
                }
            }
            self.deps.keep_alive.stop(&self.handle);
        }

        let mut event = ConnectionEvent::ok(&self.handle, Action::ConnectionLost);
        if let Some(cause) = cause {
            event.error_message = Some(cause.message.clone());
            event.exception = Some(cause.to_payload());
        }
        self.emit(event);
        self.wake.release_all();
    }

    fn delivery_complete(&self, token: Token) {
        let Some(sent) = self.pending_sends.lock().remove(&token) else {
            return;
        };
        self.emit(
            ConnectionEvent::ok(&self.handle, Action::MessageDelivered)
                .with_context(&sent.ctx)
                .with_message(None, &sent.topic, sent.message),
        );
    }

    fn message_arrived(&self, topic: &str, message: MqttMessage) -> Result<()> {
        let message_id = match self.deps.store.store(&self.handle, topic, &message) {
            Ok(id) => id,
            Err(e) => {
                let err = MqttLinkError::from(e);
                self.deps.tracer.exception(TAG, "storing arrived message failed", &err);
                return Err(err);
            }
        };
        debug!(handle = %self.handle, topic, message_id = %message_id, "message arrived");
        self.emit(
            ConnectionEvent::ok(&self.handle, Action::MessageArrived).with_message(Some(message_id), topic, message),
        );
        Ok(())
    }
}

impl ActivityCheck for Connection {
    fn check_for_activity(&self, guard: WakeGuard) -> bool {
        let Some(engine) = self.engine() else {
            return false;
        };
        let token = self.register(PendingAction::Ping(guard));
        if engine.check_for_activity(token) {
            true
        } else {
            // dropping the pending action drops the guard
            self.pending_actions.lock().remove(&token);
            false
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("handle", &self.handle)
            .field("state", &self.state())
            .field("connecting", &self.is_connecting())
            .field("disconnected", &self.is_disconnected())
            .field("clean_session", &self.is_clean_session())
            .finish()
    }
}
