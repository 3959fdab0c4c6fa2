use crate::alarm::AlarmClock;
use crate::connectivity::{Connectivity, StaticConnectivity};
use crate::core::alarm_clock::TokioAlarmClock;
use crate::core::config::ServiceConfig;
use crate::core::connection::{Collaborators, Connection};
use crate::core::connection_state::ConnectionState;
use crate::core::event::{ConnectionEvent, EventContext, EventSink, Status, TraceHandler};
use crate::core::keepalive::KeepAliveScheduler;
use crate::core::message::{ClientHandle, MqttMessage, Qos, TopicFilter};
use crate::core::options::{BufferOptions, ConnectOptions};
use crate::core::wakelock::WakeLock;
use crate::engine::{EngineFactory, MessageListener, Token};
use crate::error::{MqttLinkError, Result};
use crate::power::{NoopPowerManager, PowerManager};
use crate::store::{MessageStore, SqliteMessageStore};
use crossbeam_channel::Receiver;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Registry of logical MQTT connections
///
/// Routes every application command to the Connection registered under its
/// client handle and owns the single event channel all Connections report
/// through. The map is sharded ([`DashMap`]), so routing to one Connection
/// never waits on commands for another; an `Arc<Connection>` is cloned out
/// before any call into it.
///
/// # Example
/// ```ignore
/// let registry = ConnectionRegistry::builder()
///     .engine_factory(Arc::new(MyEngineFactory))
///     .store(Arc::new(SqliteMessageStore::open(Path::new("mqttlink.db"))?))
///     .build()?;
///
/// let handle = registry.get_or_create("tcp://broker:1883", "device-7", "app");
/// registry.connect(&handle, ConnectOptions::new().clean_session(false), EventContext::default())?;
///
/// while let Ok(event) = registry.recv_event() {
///     if event.action == Action::MessageArrived {
///         // process, then acknowledge
///         registry.acknowledge_arrival(&handle, event.message_id.as_deref().unwrap_or_default())?;
///     }
/// }
/// ```
pub struct ConnectionRegistry {
    connections: DashMap<ClientHandle, Arc<Connection>>,
    deps: Collaborators,
    events: Receiver<ConnectionEvent>,
}

impl ConnectionRegistry {
    pub fn builder() -> ConnectionRegistryBuilder {
        ConnectionRegistryBuilder::default()
    }

    /// Return the handle for `(server_uri, client_id, context_id)`, creating
    /// its Connection on first reference
    pub fn get_or_create(&self, server_uri: &str, client_id: &str, context_id: &str) -> ClientHandle {
        let handle = ClientHandle::new(server_uri, client_id, context_id);
        self.connections.entry(handle.clone()).or_insert_with(|| {
            debug!(handle = %handle, "creating connection");
            Connection::new(server_uri, client_id, context_id, self.deps.clone())
        });
        handle
    }

    /// Strict form of [`get_or_create`](Self::get_or_create)
    pub fn init_connection(&self, server_uri: &str, client_id: &str, context_id: &str) -> Result<ClientHandle> {
        let handle = ClientHandle::new(server_uri, client_id, context_id);
        match self.connections.entry(handle.clone()) {
            Entry::Occupied(_) => Err(MqttLinkError::AlreadyInitialized(handle.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Connection::new(server_uri, client_id, context_id, self.deps.clone()));
                info!(handle = %handle, "connection initialized");
                Ok(handle)
            }
        }
    }

    /// Look up the Connection behind `handle`
    pub fn connection(&self, handle: &ClientHandle) -> Result<Arc<Connection>> {
        self.connections
            .get(handle)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| MqttLinkError::InvalidHandle(handle.to_string()))
    }

    pub fn connect(&self, handle: &ClientHandle, options: ConnectOptions, ctx: EventContext) -> Result<()> {
        self.connection(handle)?.connect(options, ctx);
        Ok(())
    }

    /// Disconnect and evict; the handle is reusable only through a fresh
    /// [`get_or_create`](Self::get_or_create)
    pub fn disconnect(&self, handle: &ClientHandle, ctx: EventContext) -> Result<()> {
        self.disconnect_inner(handle, None, ctx)
    }

    /// [`disconnect`](Self::disconnect) with a quiesce timeout for in-flight work
    pub fn disconnect_with_timeout(&self, handle: &ClientHandle, quiesce: Duration, ctx: EventContext) -> Result<()> {
        self.disconnect_inner(handle, Some(quiesce), ctx)
    }

    fn disconnect_inner(&self, handle: &ClientHandle, quiesce: Option<Duration>, ctx: EventContext) -> Result<()> {
        let connection = self.connection(handle)?;
        connection.disconnect(quiesce, ctx);
        self.connections.remove(handle);
        debug!(handle = %handle, "connection evicted after disconnect");
        Ok(())
    }

    /// Close the engine handle and evict
    pub fn close(&self, handle: &ClientHandle) -> Result<()> {
        let (_, connection) = self
            .connections
            .remove(handle)
            .ok_or_else(|| MqttLinkError::InvalidHandle(handle.to_string()))?;
        connection.close();
        Ok(())
    }

    /// Publish; returns the delivery token when the engine took the message
    pub fn publish(
        &self,
        handle: &ClientHandle,
        topic: &str,
        message: MqttMessage,
        ctx: EventContext,
    ) -> Result<Option<Token>> {
        Ok(self.connection(handle)?.publish(topic, message, ctx))
    }

    /// Publish raw bytes
    pub fn publish_payload(
        &self,
        handle: &ClientHandle,
        topic: &str,
        payload: impl Into<Vec<u8>>,
        qos: Qos,
        retained: bool,
        ctx: EventContext,
    ) -> Result<Option<Token>> {
        let message = MqttMessage::new(payload).with_qos(qos).with_retained(retained);
        self.publish(handle, topic, message, ctx)
    }

    pub fn subscribe(&self, handle: &ClientHandle, topic: &str, qos: Qos, ctx: EventContext) -> Result<()> {
        self.subscribe_many(handle, &[TopicFilter::new(topic, qos)], ctx)
    }

    pub fn subscribe_many(&self, handle: &ClientHandle, filters: &[TopicFilter], ctx: EventContext) -> Result<()> {
        self.connection(handle)?.subscribe(filters, ctx);
        Ok(())
    }

    pub fn subscribe_with_listeners(
        &self,
        handle: &ClientHandle,
        filters: &[TopicFilter],
        listeners: Vec<Arc<dyn MessageListener>>,
        ctx: EventContext,
    ) -> Result<()> {
        if filters.len() != listeners.len() {
            return Err(MqttLinkError::Configuration(format!(
                "{} topic filters but {} listeners",
                filters.len(),
                listeners.len()
            )));
        }
        self.connection(handle)?
            .subscribe_with_listeners(filters, listeners, ctx);
        Ok(())
    }

    pub fn unsubscribe(&self, handle: &ClientHandle, topic: &str, ctx: EventContext) -> Result<()> {
        self.unsubscribe_many(handle, &[topic.to_owned()], ctx)
    }

    pub fn unsubscribe_many(&self, handle: &ClientHandle, topics: &[String], ctx: EventContext) -> Result<()> {
        self.connection(handle)?.unsubscribe(topics, ctx);
        Ok(())
    }

    /// Application has processed `message_id`; drop it from the backlog
    ///
    /// # Returns
    /// * `Status::Ok` - the message was stored and is now removed
    /// * `Status::Error` - unknown id (already acknowledged or never stored)
    pub fn acknowledge_arrival(&self, handle: &ClientHandle, message_id: &str) -> Result<Status> {
        self.connection(handle)?;
        let removed = self.deps.store.discard(handle, message_id)?;
        if !removed {
            debug!(handle = %handle, message_id, "acknowledged unknown message");
        }
        Ok(if removed { Status::Ok } else { Status::Error })
    }

    pub fn set_buffer_options(&self, handle: &ClientHandle, options: BufferOptions) -> Result<()> {
        self.connection(handle)?.set_buffer_options(options)
    }

    pub fn buffer_options(&self, handle: &ClientHandle) -> Result<BufferOptions> {
        Ok(self.connection(handle)?.buffer_options())
    }

    pub fn buffered_message_count(&self, handle: &ClientHandle) -> Result<usize> {
        self.connection(handle)?.buffered_message_count()
    }

    pub fn buffered_message(&self, handle: &ClientHandle, index: usize) -> Result<Option<MqttMessage>> {
        self.connection(handle)?.buffered_message(index)
    }

    pub fn delete_buffered_message(&self, handle: &ClientHandle, index: usize) -> Result<()> {
        self.connection(handle)?.delete_buffered_message(index)
    }

    pub fn pending_delivery_tokens(&self, handle: &ClientHandle) -> Result<Vec<Token>> {
        Ok(self.connection(handle)?.pending_delivery_tokens())
    }

    pub fn is_connected(&self, handle: &ClientHandle) -> Result<bool> {
        Ok(self.connection(handle)?.is_connected())
    }

    pub fn state(&self, handle: &ClientHandle) -> Result<ConnectionState> {
        Ok(self.connection(handle)?.state())
    }

    /// Connection state of every registered handle
    pub fn statuses(&self) -> HashMap<ClientHandle, ConnectionState> {
        self.connections
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().state()))
            .collect()
    }

    pub fn list_handles(&self) -> Vec<ClientHandle> {
        self.connections.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Ask every Connection to reconnect, if the network is reachable
    ///
    /// # Errors
    /// `Unreachable` when the network is down; nothing is attempted then.
    pub fn reconnect_all(&self) -> Result<()> {
        if !self.deps.connectivity.is_reachable() {
            debug!("network unreachable, skipping reconnect");
            return Err(MqttLinkError::Unreachable);
        }
        for connection in self.snapshot() {
            connection.reconnect();
        }
        Ok(())
    }

    /// Tell every Connection the network went away
    pub fn notify_offline(&self) {
        for connection in self.snapshot() {
            connection.offline();
        }
    }

    pub fn connectivity(&self) -> Arc<dyn Connectivity> {
        Arc::clone(&self.deps.connectivity)
    }

    pub fn power(&self) -> Arc<dyn PowerManager> {
        Arc::clone(&self.deps.power)
    }

    pub fn store(&self) -> Arc<dyn MessageStore> {
        Arc::clone(&self.deps.store)
    }

    pub fn keep_alive(&self) -> &Arc<KeepAliveScheduler> {
        &self.deps.keep_alive
    }

    pub fn set_trace_enabled(&self, enabled: bool) {
        self.deps.tracer.set_enabled(enabled);
    }

    /// Address trace events to `id`; `None` stops them
    pub fn set_trace_callback_id(&self, id: Option<String>) {
        self.deps.tracer.set_callback_id(id);
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ConnectionEvent> {
        self.events.try_recv().ok()
    }

    /// Receive an event (blocking)
    pub fn recv_event(&self) -> Result<ConnectionEvent> {
        self.events
            .recv()
            .map_err(|_| MqttLinkError::Configuration("event channel closed".into()))
    }

    /// Receive an event, waiting at most `timeout`
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<ConnectionEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Drain every queued event (non-blocking)
    pub fn collect_events(&self) -> Vec<ConnectionEvent> {
        self.events.try_iter().collect()
    }

    /// Receiver half of the event channel, for hosts that select over it
    pub fn events(&self) -> Receiver<ConnectionEvent> {
        self.events.clone()
    }

    /// Close every Connection and the Message Store
    pub fn shutdown(&self) -> Result<()> {
        info!(connections = self.connections.len(), "shutting down connection registry");

        let handles = self.list_handles();
        for handle in handles {
            if let Some((_, connection)) = self.connections.remove(&handle) {
                connection.close();
            }
        }

        if let Err(e) = self.deps.store.close() {
            warn!(error = %e, "error closing message store");
            return Err(e.into());
        }

        info!("connection registry shutdown complete");
        Ok(())
    }

    fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.connections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}

/// Builder for [`ConnectionRegistry`]; only the engine factory is required
#[derive(Default)]
pub struct ConnectionRegistryBuilder {
    factory: Option<Arc<dyn EngineFactory>>,
    store: Option<Arc<dyn MessageStore>>,
    power: Option<Arc<dyn PowerManager>>,
    connectivity: Option<Arc<dyn Connectivity>>,
    clock: Option<Arc<dyn AlarmClock>>,
    config: ServiceConfig,
}

impl ConnectionRegistryBuilder {
    pub fn engine_factory(mut self, factory: Arc<dyn EngineFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn power_manager(mut self, power: Arc<dyn PowerManager>) -> Self {
        self.power = Some(power);
        self
    }

    pub fn connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Wake-capable timer for keep-alive pings; defaults to the tokio timer
    pub fn alarm_clock(mut self, clock: Arc<dyn AlarmClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Timeouts, nudge delay, trace flag and, unless a store is injected,
    /// the Message Store location
    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ConnectionRegistry> {
        let factory = self
            .factory
            .ok_or_else(|| MqttLinkError::Configuration("engine factory is required".into()))?;
        let clock = match self.clock {
            Some(clock) => clock,
            None => {
                let clock = TokioAlarmClock::try_current().ok_or_else(|| {
                    MqttLinkError::Configuration("no alarm clock given and no tokio runtime running".into())
                })?;
                Arc::new(clock) as Arc<dyn AlarmClock>
            }
        };
        let power = self.power.unwrap_or_else(|| Arc::new(NoopPowerManager));
        let config = self.config;
        let store = match self.store {
            Some(store) => store,
            None => open_configured_store(&config)?,
        };

        let (sink, events) = EventSink::channel();
        let tracer = Arc::new(TraceHandler::new(sink.clone(), config.trace_enabled));
        let ping_wake = WakeLock::new("mqttlink.ping", Arc::clone(&power), config.ping_wake_timeout());

        let deps = Collaborators {
            factory,
            store,
            power,
            connectivity: self
                .connectivity
                .unwrap_or_else(|| Arc::new(StaticConnectivity::default())),
            keep_alive: KeepAliveScheduler::new(clock, ping_wake),
            sink,
            tracer,
            connect_wake_timeout: config.connect_wake_timeout(),
            reconnect_nudge: config.reconnect_nudge(),
        };

        Ok(ConnectionRegistry {
            connections: DashMap::new(),
            deps,
            events,
        })
    }
}

/// Message Store named by `config.store.path`
fn open_configured_store(config: &ServiceConfig) -> Result<Arc<dyn MessageStore>> {
    let store = if config.store_in_memory() {
        SqliteMessageStore::in_memory()?
    } else {
        SqliteMessageStore::open(&config.store.path)?
    };
    debug!(path = %store.path().display(), "message store opened from configuration");
    Ok(Arc::new(store))
}
