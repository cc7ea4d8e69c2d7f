//! Peer-to-peer radio abstraction for peerlink.
//!
//! Defines the [`P2pPlatform`] trait that wraps the operating system's
//! peer-to-peer stack: peer discovery, connect requests, group teardown, and
//! group-info queries. Asynchronous notifications (peer list changes,
//! connection changes, radio state) are delivered on the channel returned by
//! [`P2pPlatform::subscribe`].
//!
//! Two backends ship with the crate: [`fixed::FixedPlatform`], which serves a
//! static peer table for wired or LAN setups, and `mock::MockPlatform`
//! (behind the `mock` feature) for tests.

use async_trait::async_trait;
use peerlink_types::{ConnectionInfo, DeviceAddress, Peer};
use tokio::sync::mpsc;

pub mod error;
pub mod fixed;
#[cfg(feature = "mock")]
pub mod mock;

pub use error::PlatformError;

/// Parameters of a connect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectConfig {
    /// Address of the device to form a group with.
    pub device_address: DeviceAddress,
}

impl ConnectConfig {
    pub fn new(device_address: DeviceAddress) -> Self {
        Self { device_address }
    }
}

/// Notifications from the radio stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    /// Peer-to-peer was enabled or disabled on this device.
    StateChanged { enabled: bool },
    /// The set of discovered peers changed; carries the full new list.
    PeersChanged(Vec<Peer>),
    /// Group connectivity changed. When `connected` is true the caller
    /// should query [`P2pPlatform::request_connection_info`].
    ConnectionChanged { connected: bool },
}

/// The operating system's peer-to-peer stack.
///
/// Each request resolves once the platform has accepted or rejected it;
/// the effect itself (peers showing up, a group forming) arrives later as a
/// [`PlatformEvent`].
#[async_trait]
pub trait P2pPlatform: Send + 'static {
    /// Start receiving notifications. Replaces any earlier subscription.
    async fn subscribe(&mut self) -> Result<mpsc::Receiver<PlatformEvent>, PlatformError>;

    /// Stop receiving notifications. A no-op when not subscribed.
    async fn unsubscribe(&mut self) -> Result<(), PlatformError>;

    /// Start peer discovery.
    async fn discover_peers(&mut self) -> Result<(), PlatformError>;

    /// Stop peer discovery.
    async fn stop_peer_discovery(&mut self) -> Result<(), PlatformError>;

    /// Ask the platform to form a group with a peer.
    async fn connect(&mut self, config: ConnectConfig) -> Result<(), PlatformError>;

    /// Abandon a pending connect request.
    async fn cancel_connect(&mut self) -> Result<(), PlatformError>;

    /// Leave the current group.
    async fn remove_group(&mut self) -> Result<(), PlatformError>;

    /// Query group formation details for the current connection.
    async fn request_connection_info(&mut self) -> Result<ConnectionInfo, PlatformError>;
}
