//! Link negotiation: discovery, connect, role resolution, teardown.
//!
//! The negotiator runs as a single task that owns the connection state and
//! the peer directory. Caller requests, platform notifications, and session
//! notices all arrive on channels and are handled one at a time, so state
//! transitions need no locking.

use std::net::SocketAddr;
use std::sync::Arc;

use peerlink_platform::{ConnectConfig, P2pPlatform, PlatformEvent};
use peerlink_types::{status, ConnectionInfo, ConnectionState, LinkRole, OutboundEvent, Peer};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::directory::PeerDirectory;
use crate::emitter::EventEmitter;
use crate::error::LinkError;
use crate::handle::LinkHandle;
use crate::pool::WorkerPool;
use crate::session::{SessionNotice, SessionSettings, SocketSession};

/// Reply channel for a caller request.
pub type Reply = oneshot::Sender<Result<String, LinkError>>;

/// Requests processed by the negotiator's loop.
#[derive(Debug)]
pub enum LinkCommand {
    StartDiscovery(Reply),
    StopDiscovery(Reply),
    ConnectToPeer { name: String, reply: Reply },
    Disconnect(Reply),
    SendMessage { text: String, reply: Reply },
    /// Subscribe to platform notifications.
    Resume(Reply),
    /// Unsubscribe from platform notifications.
    Pause(Reply),
    /// Clean up and stop the loop. The sender is notified when done.
    Shutdown(oneshot::Sender<()>),
}

/// Snapshot of the link published after every handled input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStatus {
    pub state: ConnectionState,
    pub role: LinkRole,
    pub peers: Vec<String>,
    pub session_active: bool,
    pub subscribed: bool,
    /// Bound data listener while hosting.
    pub listening_on: Option<SocketAddr>,
}

/// The link negotiator.
pub struct LinkNegotiator {
    config: Config,
    platform: Box<dyn P2pPlatform>,
    directory: PeerDirectory,
    session: SocketSession,
    emitter: EventEmitter,
    pool: Arc<WorkerPool>,
    state: ConnectionState,
    /// Session started by the last role resolution.
    current_session: Option<u64>,
    listening_on: Option<SocketAddr>,
    platform_rx: Option<mpsc::Receiver<PlatformEvent>>,
    command_tx: mpsc::Sender<LinkCommand>,
    command_rx: mpsc::Receiver<LinkCommand>,
    notice_rx: mpsc::UnboundedReceiver<SessionNotice>,
    status_tx: watch::Sender<LinkStatus>,
    cleaned_up: bool,
}

impl LinkNegotiator {
    /// Create a negotiator over the given platform backend.
    pub fn new(config: Config, platform: Box<dyn P2pPlatform>) -> Result<Self, LinkError> {
        let settings = SessionSettings {
            bind: config.link.bind_addr()?,
            connect_timeout: config.link.connect_timeout(),
        };
        let (command_tx, command_rx) = mpsc::channel(config.link.command_queue.max(1));
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(LinkStatus::default());
        let emitter = EventEmitter::new();
        let pool = Arc::new(WorkerPool::new());
        let session = SocketSession::new(settings, emitter.clone(), Arc::clone(&pool), notice_tx);

        Ok(Self {
            config,
            platform,
            directory: PeerDirectory::new(),
            session,
            emitter,
            pool,
            state: ConnectionState::Idle,
            current_session: None,
            listening_on: None,
            platform_rx: None,
            command_tx,
            command_rx,
            notice_rx,
            status_tx,
            cleaned_up: false,
        })
    }

    /// Caller-facing handle for sending requests and attaching a listener.
    pub fn handle(&self) -> LinkHandle {
        LinkHandle::new(
            self.command_tx.clone(),
            self.emitter.clone(),
            self.status_tx.subscribe(),
        )
    }

    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    pub fn status_receiver(&self) -> watch::Receiver<LinkStatus> {
        self.status_tx.subscribe()
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn directory(&self) -> &PeerDirectory {
        &self.directory
    }

    /// Run the negotiation loop until shutdown.
    pub async fn run(&mut self) -> Result<(), LinkError> {
        self.resume().await?;
        info!(name = %self.config.identity.name, port = self.config.link.port, "link negotiator running");
        self.publish();

        let done = loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    let Some(command) = command else {
                        break None;
                    };
                    if let Some(done) = self.handle_command(command).await {
                        break Some(done);
                    }
                }
                event = next_platform_event(&mut self.platform_rx) => {
                    match event {
                        Some(event) => self.handle_platform_event(event).await,
                        None => {
                            warn!("platform notification channel closed");
                            self.platform_rx = None;
                        }
                    }
                }
                Some(notice) = self.notice_rx.recv() => {
                    self.handle_session_notice(notice);
                }
            }
            self.publish();
        };

        info!("shutting down");
        self.cleanup().await;
        self.publish();
        if let Some(done) = done {
            let _ = done.send(());
        }
        Ok(())
    }

    /// Handle one request. Returns the acknowledgement sender when the
    /// request was `Shutdown`.
    async fn handle_command(&mut self, command: LinkCommand) -> Option<oneshot::Sender<()>> {
        match command {
            LinkCommand::StartDiscovery(reply) => {
                let _ = reply.send(self.start_discovery().await);
            }
            LinkCommand::StopDiscovery(reply) => {
                let _ = reply.send(self.stop_discovery().await);
            }
            LinkCommand::ConnectToPeer { name, reply } => {
                let _ = reply.send(self.connect_to_peer(&name).await);
            }
            LinkCommand::Disconnect(reply) => {
                let _ = reply.send(self.disconnect().await);
            }
            LinkCommand::SendMessage { text, reply } => self.send_message(text, reply),
            LinkCommand::Resume(reply) => {
                let _ = reply.send(self.resume().await.map(|()| "Subscribed".to_string()));
            }
            LinkCommand::Pause(reply) => {
                self.pause().await;
                let _ = reply.send(Ok("Unsubscribed".to_string()));
            }
            LinkCommand::Shutdown(done) => return Some(done),
        }
        None
    }

    /// Ask the platform to start discovery.
    pub async fn start_discovery(&mut self) -> Result<String, LinkError> {
        match self.platform.discover_peers().await {
            Ok(()) => {
                self.state = ConnectionState::Discovering;
                info!("discovery started");
                self.emitter.status(status::DISCOVERY_STARTED);
                Ok(status::DISCOVERY_STARTED.to_string())
            }
            Err(e) => {
                let reason = e.reason();
                warn!(%reason, "discovery failed");
                self.state = ConnectionState::Failed(reason.to_string());
                Err(self.emitter.report(LinkError::DiscoveryFailed(reason)))
            }
        }
    }

    /// Ask the platform to stop discovery.
    pub async fn stop_discovery(&mut self) -> Result<String, LinkError> {
        match self.platform.stop_peer_discovery().await {
            Ok(()) => {
                if self.state == ConnectionState::Discovering {
                    self.state = ConnectionState::Idle;
                }
                info!("discovery stopped");
                self.emitter.status(status::DISCOVERY_STOPPED);
                Ok(status::DISCOVERY_STOPPED.to_string())
            }
            Err(e) => {
                let reason = e.reason();
                warn!(%reason, "stop discovery failed");
                self.state = ConnectionState::Failed(reason.to_string());
                Err(self.emitter.report(LinkError::StopDiscoveryFailed(reason)))
            }
        }
    }

    /// Replace the directory with the platform's latest peer list.
    pub fn on_peers_changed(&mut self, peers: Vec<Peer>) {
        self.directory.replace(peers);
        let names = self.directory.names();
        debug!(peers = ?names, "peers available");
        self.emitter.emit(OutboundEvent::peers(names));
    }

    /// Request a group with the peer shown as `name`.
    pub async fn connect_to_peer(&mut self, name: &str) -> Result<String, LinkError> {
        let Some(peer) = self.directory.resolve(name).cloned() else {
            warn!(peer = %name, "peer not in directory");
            return Err(self.emitter.report(LinkError::PeerNotFound(name.to_string())));
        };

        match self
            .platform
            .connect(ConnectConfig::new(peer.address.clone()))
            .await
        {
            Ok(()) => {
                self.state = ConnectionState::Connecting;
                info!(peer = %peer.name, address = %peer.address, "connection initiated");
                self.emitter.status(status::CONNECTION_INITIATED);
                Ok(status::CONNECTION_INITIATED.to_string())
            }
            Err(e) => {
                let reason = e.reason();
                warn!(peer = %peer.name, %reason, "connection failed");
                Err(self.emitter.report(LinkError::ConnectionFailed(reason)))
            }
        }
    }

    /// Resolve the link role from group formation info and start the
    /// matching session.
    pub fn on_connection_info_available(&mut self, info: ConnectionInfo) {
        if !info.group_formed {
            debug!("connection info without a formed group");
            return;
        }
        if self.session.role().is_resolved() {
            debug!(role = %self.session.role(), "role already resolved for this group");
            return;
        }

        let role = LinkRole::from_group_owner(info.is_group_owner);
        info!(%role, owner = ?info.group_owner_address, "group formed");
        self.emitter.status(status::CONNECTED);
        self.state = ConnectionState::AwaitingPeer;

        let started = match role {
            LinkRole::Host => self.session.establish_as_host(),
            LinkRole::Client => match info.group_owner_address {
                Some(owner) => self.session.establish_as_client(owner),
                None => {
                    warn!("group formed without an owner address");
                    self.emitter
                        .error("Client error: group owner address unknown");
                    self.state = ConnectionState::Disconnected;
                    return;
                }
            },
            LinkRole::Unresolved => return,
        };

        match started {
            Ok(id) => self.current_session = Some(id),
            Err(e) => {
                warn!(error = %e, "could not start session");
                self.state = ConnectionState::Disconnected;
            }
        }
    }

    /// Leave the group and close the session.
    pub async fn disconnect(&mut self) -> Result<String, LinkError> {
        match self.platform.remove_group().await {
            Ok(()) => {
                info!("disconnected from group");
                self.emitter.status(status::DISCONNECTED);
                self.close_session();
                self.state = ConnectionState::Disconnected;
                Ok(status::DISCONNECTED.to_string())
            }
            Err(e) => {
                let reason = e.reason();
                warn!(%reason, "failed to disconnect");
                Err(self.emitter.report(LinkError::DisconnectFailed(reason)))
            }
        }
    }

    /// Send `text` on a pool task; the reply is sent from there.
    pub fn send_message(&self, text: String, reply: Reply) {
        let session = self.session.clone();
        let spawned = self.pool.spawn(async move {
            let result = session
                .send_message(&text)
                .await
                .map(|()| "Message sent".to_string());
            let _ = reply.send(result);
        });
        if spawned.is_none() {
            debug!("worker pool closed, send dropped");
        }
    }

    /// Subscribe to platform notifications if not already subscribed.
    pub async fn resume(&mut self) -> Result<(), LinkError> {
        if self.platform_rx.is_some() {
            return Ok(());
        }
        match self.platform.subscribe().await {
            Ok(rx) => {
                self.platform_rx = Some(rx);
                debug!("subscribed to platform notifications");
                Ok(())
            }
            Err(e) => Err(self.emitter.report(LinkError::Platform(e))),
        }
    }

    /// Unsubscribe from platform notifications. Never fails.
    pub async fn pause(&mut self) {
        if let Err(e) = self.platform.unsubscribe().await {
            debug!(error = %e, "unsubscribe failed");
        }
        self.platform_rx = None;
    }

    /// Best-effort teardown of everything. Runs once; later calls do nothing.
    pub async fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;

        self.pause().await;
        if let Err(e) = self.platform.cancel_connect().await {
            debug!(error = %e, "cancel connect failed during cleanup");
        }
        if let Err(e) = self.platform.remove_group().await {
            debug!(error = %e, "remove group failed during cleanup");
        }
        self.close_session();
        self.pool.shutdown();
        self.state = ConnectionState::Idle;
        info!("link cleaned up");
    }

    async fn handle_platform_event(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::StateChanged { enabled } => {
                info!(enabled, "peer-to-peer state changed");
                self.emitter.status(if enabled {
                    status::P2P_ENABLED
                } else {
                    status::P2P_DISABLED
                });
            }
            PlatformEvent::PeersChanged(peers) => self.on_peers_changed(peers),
            PlatformEvent::ConnectionChanged { connected: true } => {
                match self.platform.request_connection_info().await {
                    Ok(info) => self.on_connection_info_available(info),
                    Err(e) => {
                        warn!(error = %e, "connection info unavailable");
                        self.emitter
                            .error(format!("Connection info unavailable: {e}"));
                    }
                }
            }
            PlatformEvent::ConnectionChanged { connected: false } => {
                // A session task that already tore its session down has
                // reported the close itself; its Closed notice may still be
                // queued.
                let closed_by_session = self
                    .current_session
                    .is_some_and(|id| self.session.current_id() != Some(id));
                let had_session = self.close_session();
                let was_linked = self.state.is_linked();
                if had_session || was_linked {
                    self.state = ConnectionState::Disconnected;
                }
                if had_session || (was_linked && !closed_by_session) {
                    info!("group lost");
                    self.emitter.status(status::DISCONNECTED);
                } else {
                    debug!("group lost after the session already closed");
                }
            }
        }
    }

    fn handle_session_notice(&mut self, notice: SessionNotice) {
        match notice {
            SessionNotice::Listening { id, addr } if self.current_session == Some(id) => {
                self.listening_on = Some(addr);
            }
            SessionNotice::Established { id, role } if self.current_session == Some(id) => {
                debug!(id, %role, "session established");
                self.listening_on = None;
                self.state = ConnectionState::Connected;
            }
            SessionNotice::Closed { id } if self.current_session == Some(id) => {
                debug!(id, "session closed");
                self.current_session = None;
                self.listening_on = None;
                self.state = ConnectionState::Disconnected;
            }
            stale => debug!(?stale, "ignoring notice for a previous session"),
        }
    }

    fn close_session(&mut self) -> bool {
        self.current_session = None;
        self.listening_on = None;
        self.session.teardown()
    }

    fn publish(&self) {
        self.status_tx.send_replace(LinkStatus {
            state: self.state.clone(),
            role: self.session.role(),
            peers: self.directory.names(),
            session_active: self.session.is_connected(),
            subscribed: self.platform_rx.is_some(),
            listening_on: self.listening_on,
        });
    }
}

async fn next_platform_event(rx: &mut Option<mpsc::Receiver<PlatformEvent>>) -> Option<PlatformEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
