//! Mock platform backend for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use peerlink_types::{ConnectionInfo, FailureReason, Peer};
use tokio::sync::mpsc;

use crate::error::PlatformError;
use crate::{ConnectConfig, P2pPlatform, PlatformEvent};

/// A platform request, recorded in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformOp {
    Subscribe,
    Unsubscribe,
    DiscoverPeers,
    StopPeerDiscovery,
    Connect,
    CancelConnect,
    RemoveGroup,
    RequestConnectionInfo,
}

#[derive(Debug, Default)]
struct MockPlatformState {
    calls: Vec<PlatformOp>,
    connects: Vec<ConnectConfig>,
    /// One-shot failures keyed by operation.
    failures: HashMap<PlatformOp, FailureReason>,
    connection_info: ConnectionInfo,
    event_tx: Option<mpsc::Sender<PlatformEvent>>,
}

/// Mock platform backend.
///
/// Requests succeed unless a failure was armed with
/// [`MockPlatformHandle::fail_next`]. Notifications are injected by tests
/// through the handle.
pub struct MockPlatform {
    state: Arc<Mutex<MockPlatformState>>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new().0
    }
}

impl MockPlatform {
    /// Create a new mock platform and a handle for driving it.
    pub fn new() -> (Self, MockPlatformHandle) {
        let state = Arc::new(Mutex::new(MockPlatformState::default()));
        let handle = MockPlatformHandle {
            state: Arc::clone(&state),
        };
        (Self { state }, handle)
    }

    fn record(&self, op: PlatformOp) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op);
        match state.failures.remove(&op) {
            Some(reason) => Err(PlatformError::Rejected(reason)),
            None => Ok(()),
        }
    }
}

/// Clonable handle for driving and observing a [`MockPlatform`].
#[derive(Clone)]
pub struct MockPlatformHandle {
    state: Arc<Mutex<MockPlatformState>>,
}

impl MockPlatformHandle {
    /// Make the next call of `op` fail with the given raw platform code.
    pub fn fail_next(&self, op: PlatformOp, code: i32) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(op, FailureReason::from_code(code));
    }

    /// Set what `request_connection_info` returns.
    pub fn set_connection_info(&self, info: ConnectionInfo) {
        self.state.lock().unwrap().connection_info = info;
    }

    /// Snapshot of recorded calls.
    pub fn calls(&self) -> Vec<PlatformOp> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Snapshot of connect requests.
    pub fn connects(&self) -> Vec<ConnectConfig> {
        self.state.lock().unwrap().connects.clone()
    }

    /// Whether a subscriber is attached.
    pub fn is_subscribed(&self) -> bool {
        self.state.lock().unwrap().event_tx.is_some()
    }

    /// Deliver a notification. Returns `false` if nobody is subscribed.
    pub async fn notify(&self, event: PlatformEvent) -> bool {
        let tx = self.state.lock().unwrap().event_tx.clone();
        match tx {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    pub async fn peers_changed(&self, peers: Vec<Peer>) -> bool {
        self.notify(PlatformEvent::PeersChanged(peers)).await
    }

    /// Set the connection info and announce a connection change.
    pub async fn group_formed(&self, info: ConnectionInfo) -> bool {
        self.set_connection_info(info);
        self.notify(PlatformEvent::ConnectionChanged { connected: true })
            .await
    }

    pub async fn group_lost(&self) -> bool {
        self.set_connection_info(ConnectionInfo::default());
        self.notify(PlatformEvent::ConnectionChanged { connected: false })
            .await
    }
}

#[async_trait]
impl P2pPlatform for MockPlatform {
    async fn subscribe(&mut self) -> Result<mpsc::Receiver<PlatformEvent>, PlatformError> {
        self.record(PlatformOp::Subscribe)?;
        let (tx, rx) = mpsc::channel(64);
        self.state.lock().unwrap().event_tx = Some(tx);
        Ok(rx)
    }

    async fn unsubscribe(&mut self) -> Result<(), PlatformError> {
        self.record(PlatformOp::Unsubscribe)?;
        self.state.lock().unwrap().event_tx = None;
        Ok(())
    }

    async fn discover_peers(&mut self) -> Result<(), PlatformError> {
        self.record(PlatformOp::DiscoverPeers)
    }

    async fn stop_peer_discovery(&mut self) -> Result<(), PlatformError> {
        self.record(PlatformOp::StopPeerDiscovery)
    }

    async fn connect(&mut self, config: ConnectConfig) -> Result<(), PlatformError> {
        self.record(PlatformOp::Connect)?;
        self.state.lock().unwrap().connects.push(config);
        Ok(())
    }

    async fn cancel_connect(&mut self) -> Result<(), PlatformError> {
        self.record(PlatformOp::CancelConnect)
    }

    async fn remove_group(&mut self) -> Result<(), PlatformError> {
        self.record(PlatformOp::RemoveGroup)
    }

    async fn request_connection_info(&mut self) -> Result<ConnectionInfo, PlatformError> {
        self.record(PlatformOp::RequestConnectionInfo)?;
        Ok(self.state.lock().unwrap().connection_info)
    }
}
