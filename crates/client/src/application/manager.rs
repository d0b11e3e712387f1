//! Connection lifecycle controller.
//!
//! A single task owns the transport link, all timers, the subscription
//! registry and the reconciler's write side. Everything that can change
//! client state arrives on one `select!` loop: facade commands, the pending
//! open, inbound frames, the heartbeat tick, the liveness watchdog and the
//! reconnect timer. Frames are therefore processed strictly in delivery
//! order, and a timer stops existing as soon as its `Option` is cleared.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use log::{debug, error, info, trace, warn};
use marketfeed_core::Topic;
use std::future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Instant, Interval, MissedTickBehavior, Sleep};

use super::adapter::ProtocolAdapter;
use super::config::ClientConfig;
use super::reconciler::{FeedView, StateReconciler};
use super::registry::SubscriptionRegistry;
use crate::domain::{
    ClientRequest, ConnectionState, ConnectionStatus, FeedEvent, FeedNotice, FeedTransport, Frame,
    TransportLink, TransportMessage,
};
use crate::error::TransportError;

/// Capacity of the consumer notice channel
const NOTICE_CAPACITY: usize = 256;

/// Instructions from the facade to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    Disconnect,
    Subscribe(Vec<Topic>),
    Unsubscribe(Vec<Topic>),
    Resync(Vec<Topic>),
    Shutdown,
}

type PendingOpen = BoxFuture<'static, Result<TransportLink, TransportError>>;

/// Lifecycle state owned by the controller task
struct ClientState {
    connection: ConnectionState,
    pending_open: Option<PendingOpen>,
    outbound: Option<mpsc::Sender<String>>,
    inbound: Option<mpsc::Receiver<TransportMessage>>,
    heartbeat: Option<Interval>,
    watchdog: Option<Pin<Box<Sleep>>>,
    reconnect: Option<Pin<Box<Sleep>>>,
    attempt: u32,
    /// Set by an explicit disconnect; suppresses automatic reconnects
    teardown_requested: bool,
    last_error: Option<String>,
    last_frame_at: Option<DateTime<Utc>>,
}

impl ClientState {
    fn new() -> Self {
        ClientState {
            connection: ConnectionState::Disconnected,
            pending_open: None,
            outbound: None,
            inbound: None,
            heartbeat: None,
            watchdog: None,
            reconnect: None,
            attempt: 0,
            teardown_requested: false,
            last_error: None,
            last_frame_at: None,
        }
    }
}

/// Handles shared between the controller and its consumers
pub struct ManagerHandles {
    pub commands: mpsc::UnboundedSender<Command>,
    pub view: FeedView,
    pub status: Arc<ArcSwap<ConnectionStatus>>,
    pub notices: broadcast::Sender<FeedNotice>,
}

pub struct ConnectionManager<T: FeedTransport> {
    transport: Arc<T>,
    config: ClientConfig,
    adapter: ProtocolAdapter,
    reconciler: StateReconciler,
    registry: SubscriptionRegistry,
    status: Arc<ArcSwap<ConnectionStatus>>,
    notices: broadcast::Sender<FeedNotice>,
    commands: mpsc::UnboundedReceiver<Command>,
    state: ClientState,
}

impl<T: FeedTransport> ConnectionManager<T> {
    pub fn new(config: ClientConfig, transport: T) -> (Self, ManagerHandles) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (notice_tx, _) = broadcast::channel(NOTICE_CAPACITY);
        let reconciler = StateReconciler::new(config.capacities);
        let registry = SubscriptionRegistry::new(config.topics.iter().copied());
        let status = Arc::new(ArcSwap::from_pointee(ConnectionStatus::default()));

        let handles = ManagerHandles {
            commands: command_tx,
            view: reconciler.view(),
            status: Arc::clone(&status),
            notices: notice_tx.clone(),
        };

        let manager = ConnectionManager {
            transport: Arc::new(transport),
            config,
            adapter: ProtocolAdapter::new(),
            reconciler,
            registry,
            status,
            notices: notice_tx,
            commands: command_rx,
            state: ClientState::new(),
        };
        (manager, handles)
    }

    /// Drive the client until shutdown or until every command sender is gone
    pub async fn run(mut self) {
        info!("Feed controller started for {}", self.config.endpoint);
        if self.config.auto_connect {
            self.connect();
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                result = poll_pending(&mut self.state.pending_open) => {
                    self.state.pending_open = None;
                    self.on_open_result(result);
                }
                message = recv_inbound(&mut self.state.inbound) => self.on_transport_message(message),
                _ = tick(&mut self.state.heartbeat) => self.send_heartbeat(),
                _ = expire(&mut self.state.watchdog) => self.on_liveness_timeout(),
                _ = expire(&mut self.state.reconnect) => {
                    self.state.reconnect = None;
                    self.open();
                }
            }
        }

        self.state.teardown_requested = true;
        self.state.reconnect = None;
        self.drop_link();
        self.set_connection(ConnectionState::Disconnected);
        info!("Feed controller stopped");
    }

    fn handle_command(&mut self, command: Command) {
        let connected = self.state.connection.is_open();
        match command {
            Command::Connect => self.connect(),
            Command::Disconnect => self.disconnect(),
            Command::Subscribe(topics) => {
                let requests = self.registry.subscribe(&topics, connected);
                self.send_all(requests);
            }
            Command::Unsubscribe(topics) => {
                let requests = self.registry.unsubscribe(&topics, connected);
                self.send_all(requests);
            }
            Command::Resync(topics) => {
                let requests = self.registry.resync(&topics, connected);
                self.send_all(requests);
            }
            Command::Shutdown => {}
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    fn connect(&mut self) {
        self.state.teardown_requested = false;
        if self.state.connection.is_active() {
            debug!("connect() ignored, already {:?}", self.state.connection);
            return;
        }
        if self.state.reconnect.take().is_some() {
            debug!("Superseding scheduled reconnect");
        }
        self.open();
    }

    fn open(&mut self) {
        let transport = Arc::clone(&self.transport);
        let endpoint = self.config.endpoint.clone();
        info!(
            "Connecting to {} (attempt {})",
            endpoint,
            self.state.attempt + 1
        );
        self.state.pending_open = Some(Box::pin(async move { transport.open(&endpoint).await }));
        self.set_connection(ConnectionState::Connecting);
    }

    fn on_open_result(&mut self, result: Result<TransportLink, TransportError>) {
        match result {
            Ok(link) => self.on_open(link),
            Err(e) => {
                warn!("Connection to {} failed: {}", self.config.endpoint, e);
                self.state.last_error = Some(e.to_string());
                self.on_closed();
            }
        }
    }

    fn on_open(&mut self, link: TransportLink) {
        info!("Connected to {}", self.config.endpoint);
        self.state.outbound = Some(link.outbound);
        self.state.inbound = Some(link.inbound);
        self.state.attempt = 0;
        self.state.last_error = None;

        let period = self.config.heartbeat_interval;
        self.state.heartbeat = (!period.is_zero()).then(|| {
            let mut heartbeat = time::interval_at(Instant::now() + period, period);
            heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
            heartbeat
        });
        self.state.watchdog = self
            .config
            .liveness_timeout
            .map(|timeout| Box::pin(time::sleep(timeout)));

        self.set_connection(ConnectionState::Open);
        let requests = self.registry.on_open();
        self.send_all(requests);
    }

    /// Link lost for any reason other than an explicit disconnect
    fn on_closed(&mut self) {
        self.drop_link();
        if self.config.reconnect.enabled && !self.state.teardown_requested {
            self.state.attempt = self.state.attempt.saturating_add(1);
            let delay = self.config.reconnect.delay_for_attempt(self.state.attempt);
            info!(
                "Reconnecting in {:?} (attempt {})",
                delay, self.state.attempt
            );
            self.state.reconnect = Some(Box::pin(time::sleep(delay)));
        }
        self.set_connection(ConnectionState::Disconnected);
    }

    fn disconnect(&mut self) {
        info!("Disconnecting from feed");
        self.state.teardown_requested = true;
        self.state.reconnect = None;
        if self.state.outbound.is_some() {
            self.set_connection(ConnectionState::Closing);
        }
        self.drop_link();
        self.set_connection(ConnectionState::Disconnected);
    }

    /// Release the link and every timer scoped to it. Dropping the outbound
    /// sender asks the transport to close.
    fn drop_link(&mut self) {
        self.state.pending_open = None;
        self.state.outbound = None;
        self.state.inbound = None;
        self.state.heartbeat = None;
        self.state.watchdog = None;
        self.registry.on_close();
    }

    fn on_liveness_timeout(&mut self) {
        let timeout = self.config.liveness_timeout.unwrap_or_default();
        warn!("No frames for {:?}, dropping the link", timeout);
        self.state.last_error = Some(format!("No data received for {:?}", timeout));
        self.on_closed();
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    fn on_transport_message(&mut self, message: Option<TransportMessage>) {
        match message {
            Some(TransportMessage::Text(text)) => self.on_frame(&text),
            Some(TransportMessage::Closed { reason }) => {
                info!(
                    "Feed closed the connection: {}",
                    reason.as_deref().unwrap_or("no reason given")
                );
                self.on_closed();
            }
            Some(TransportMessage::Failed(e)) => {
                warn!("Transport failed: {}", e);
                self.state.last_error = Some(format!("Connection lost: {}", e));
                self.on_closed();
            }
            None => {
                warn!("Transport link dropped without a close");
                self.on_closed();
            }
        }
    }

    fn on_frame(&mut self, text: &str) {
        self.state.last_frame_at = Some(Utc::now());
        if let (Some(timeout), Some(watchdog)) =
            (self.config.liveness_timeout, self.state.watchdog.as_mut())
        {
            watchdog.as_mut().reset(Instant::now() + timeout);
        }

        let adapter = self.adapter;
        match Frame::parse(text).and_then(|frame| adapter.normalize(frame)) {
            Ok(Some(event)) => {
                trace!("Frame normalized to {}", event.kind());
                self.dispatch(event);
            }
            Ok(None) => self.publish_status(),
            Err(e) => {
                warn!("Dropping frame: {}", e);
                let message = e.to_string();
                self.state.last_error = Some(message.clone());
                let _ = self.notices.send(FeedNotice::Error(message));
                self.publish_status();
            }
        }
    }

    fn dispatch(&mut self, event: FeedEvent) {
        if let FeedEvent::ErrorReceived { message } = &event {
            error!("Feed reported an error: {}", message);
            self.state.last_error = Some(message.clone());
            let _ = self.notices.send(FeedNotice::Error(message.clone()));
            self.publish_status();
            return;
        }

        self.state.last_error = None;
        let changed = self.reconciler.apply(&event);
        let had_snapshot = self.registry.snapshot_received();

        match event {
            FeedEvent::WelcomeReceived(info) => {
                info!("Session established, client id {}", info.client_id);
                let requests = self.registry.on_welcome();
                self.send_all(requests);
                let _ = self.notices.send(FeedNotice::SessionEstablished {
                    client_id: info.client_id,
                });
            }
            FeedEvent::SnapshotReceived { topic, .. } => self.registry.on_snapshot(topic),
            FeedEvent::SnapshotComplete { topics } => {
                info!("Server marked snapshot complete");
                self.registry.on_snapshot_complete(&topics);
            }
            FeedEvent::SubscriptionAck { topics } => debug!("Subscribed to {:?}", topics),
            FeedEvent::Unsubscribed { topics } => debug!("Unsubscribed from {:?}", topics),
            FeedEvent::UpdateReceived { .. }
            | FeedEvent::HeartbeatReceived
            | FeedEvent::ErrorReceived { .. } => {}
        }

        if let Some(topic) = changed {
            let _ = self.notices.send(FeedNotice::TopicUpdated(topic));
        }
        if !had_snapshot && self.registry.snapshot_received() {
            let _ = self.notices.send(FeedNotice::SnapshotComplete);
        }
        self.publish_status();
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    fn send_heartbeat(&mut self) {
        trace!("Sending keep-alive ping");
        self.send(&ClientRequest::Ping);
    }

    fn send_all(&mut self, requests: Vec<ClientRequest>) {
        for request in &requests {
            self.send(request);
        }
    }

    /// Queue a request on the link without waiting. Returns false if it
    /// was dropped.
    fn send(&self, request: &ClientRequest) -> bool {
        let Some(outbound) = &self.state.outbound else {
            debug!("Not connected, dropping {:?}", request);
            return false;
        };
        let json = match request.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize {:?}: {}", request, e);
                return false;
            }
        };
        match outbound.try_send(json) {
            Ok(()) => {
                debug!("Sent {:?}", request);
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue full, dropping {:?}", request);
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Outbound link closed, dropping {:?}", request);
                false
            }
        }
    }

    // ========================================================================
    // Status
    // ========================================================================

    fn set_connection(&mut self, connection: ConnectionState) {
        let changed = self.state.connection != connection;
        self.state.connection = connection;
        self.publish_status();
        if changed {
            let _ = self.notices.send(FeedNotice::ConnectionChanged(connection));
        }
    }

    fn publish_status(&self) {
        let status = ConnectionStatus {
            state: self.state.connection,
            reconnect_attempt: self.state.attempt,
            last_error: self.state.last_error.clone(),
            last_frame_at: self.state.last_frame_at,
            snapshot_received: self.registry.snapshot_received(),
        };
        let current = self.status.load();
        if **current != status {
            self.status.store(Arc::new(status));
        }
    }
}

async fn poll_pending(
    pending: &mut Option<PendingOpen>,
) -> Result<TransportLink, TransportError> {
    match pending {
        Some(open) => open.await,
        None => future::pending().await,
    }
}

async fn recv_inbound(
    inbound: &mut Option<mpsc::Receiver<TransportMessage>>,
) -> Option<TransportMessage> {
    match inbound {
        Some(rx) => rx.recv().await,
        None => future::pending().await,
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending().await,
    }
}

async fn expire(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => future::pending().await,
    }
}
