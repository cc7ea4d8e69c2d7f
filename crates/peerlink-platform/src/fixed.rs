//! Static peer table backend.
//!
//! Serves a fixed list of peers from configuration instead of a radio
//! stack. Useful when both devices already share a network (wired LAN,
//! hotspot) and only the socket session is needed. Group ownership is
//! decided up front by configuration: exactly one side must set
//! `group_owner`.

use std::net::{IpAddr, Ipv4Addr};

use async_trait::async_trait;
use peerlink_types::{ConnectionInfo, Peer};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::PlatformError;
use crate::{ConnectConfig, P2pPlatform, PlatformEvent};

/// Capacity of the notification channel handed out by `subscribe`.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A peer entry in the static table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedPeer {
    pub name: String,
    /// Device address reported to discovery; defaults to the IP address.
    #[serde(default)]
    pub address: Option<String>,
    pub ip: IpAddr,
}

impl FixedPeer {
    fn to_peer(&self) -> Peer {
        let address = self.address.clone().unwrap_or_else(|| self.ip.to_string());
        Peer::new(address, self.name.clone())
    }
}

/// Platform backend backed by a static peer table.
pub struct FixedPlatform {
    peers: Vec<FixedPeer>,
    group_owner: bool,
    local_ip: IpAddr,
    event_tx: Option<mpsc::Sender<PlatformEvent>>,
    discovering: bool,
    group: Option<FixedPeer>,
}

impl FixedPlatform {
    pub fn new(peers: Vec<FixedPeer>, group_owner: bool) -> Self {
        Self {
            peers,
            group_owner,
            local_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            event_tx: None,
            discovering: false,
            group: None,
        }
    }

    /// Address reported as the group owner address when this side owns the
    /// group.
    #[must_use]
    pub fn with_local_ip(mut self, ip: IpAddr) -> Self {
        self.local_ip = ip;
        self
    }

    pub fn is_discovering(&self) -> bool {
        self.discovering
    }

    fn notify(&self, event: PlatformEvent) {
        let Some(tx) = &self.event_tx else {
            debug!(?event, "no subscriber, dropping platform event");
            return;
        };
        // The subscriber is the task calling into us, so never block on it.
        if let Err(e) = tx.try_send(event) {
            warn!(error = %e, "failed to deliver platform event");
        }
    }
}

#[async_trait]
impl P2pPlatform for FixedPlatform {
    async fn subscribe(&mut self) -> Result<mpsc::Receiver<PlatformEvent>, PlatformError> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.event_tx = Some(tx);
        self.notify(PlatformEvent::StateChanged { enabled: true });
        Ok(rx)
    }

    async fn unsubscribe(&mut self) -> Result<(), PlatformError> {
        self.event_tx = None;
        Ok(())
    }

    async fn discover_peers(&mut self) -> Result<(), PlatformError> {
        self.discovering = true;
        let peers = self.peers.iter().map(FixedPeer::to_peer).collect();
        self.notify(PlatformEvent::PeersChanged(peers));
        Ok(())
    }

    async fn stop_peer_discovery(&mut self) -> Result<(), PlatformError> {
        self.discovering = false;
        Ok(())
    }

    async fn connect(&mut self, config: ConnectConfig) -> Result<(), PlatformError> {
        let peer = self
            .peers
            .iter()
            .find(|p| p.to_peer().address == config.device_address)
            .cloned()
            .ok_or_else(|| PlatformError::UnknownDevice(config.device_address.to_string()))?;
        debug!(peer = %peer.name, ip = %peer.ip, "forming fixed group");
        self.group = Some(peer);
        self.notify(PlatformEvent::ConnectionChanged { connected: true });
        Ok(())
    }

    async fn cancel_connect(&mut self) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn remove_group(&mut self) -> Result<(), PlatformError> {
        match self.group.take() {
            Some(peer) => {
                debug!(peer = %peer.name, "left fixed group");
                Ok(())
            }
            None => Err(PlatformError::Rejected(peerlink_types::FailureReason::Error)),
        }
    }

    async fn request_connection_info(&mut self) -> Result<ConnectionInfo, PlatformError> {
        let Some(peer) = &self.group else {
            return Ok(ConnectionInfo::default());
        };
        if self.group_owner {
            Ok(ConnectionInfo::owner(self.local_ip))
        } else {
            Ok(ConnectionInfo::client_of(peer.ip))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerlink_types::DeviceAddress;

    fn table() -> Vec<FixedPeer> {
        vec![
            FixedPeer {
                name: "Pixel-7".to_string(),
                address: Some("aa:bb:cc:dd:ee:01".to_string()),
                ip: "192.168.49.1".parse().unwrap(),
            },
            FixedPeer {
                name: "laptop".to_string(),
                address: None,
                ip: "192.168.49.7".parse().unwrap(),
            },
        ]
    }

    #[tokio::test]
    async fn discovery_reports_table_in_order() {
        let mut platform = FixedPlatform::new(table(), false);
        let mut rx = platform.subscribe().await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(PlatformEvent::StateChanged { enabled: true })
        );

        platform.discover_peers().await.unwrap();
        assert!(platform.is_discovering());
        match rx.recv().await {
            Some(PlatformEvent::PeersChanged(peers)) => {
                let names: Vec<_> = peers.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, ["Pixel-7", "laptop"]);
                assert_eq!(peers[1].address.as_str(), "192.168.49.7");
            }
            other => panic!("expected PeersChanged, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn client_side_reports_peer_as_owner() {
        let mut platform = FixedPlatform::new(table(), false);
        let mut rx = platform.subscribe().await.unwrap();
        let _ = rx.recv().await;

        platform
            .connect(ConnectConfig::new(DeviceAddress::new("aa:bb:cc:dd:ee:01")))
            .await
            .unwrap();
        assert_eq!(
            rx.recv().await,
            Some(PlatformEvent::ConnectionChanged { connected: true })
        );

        let info = platform.request_connection_info().await.unwrap();
        assert!(info.group_formed);
        assert!(!info.is_group_owner);
        assert_eq!(
            info.group_owner_address,
            Some("192.168.49.1".parse().unwrap())
        );
    }

    #[tokio::test]
    async fn unknown_device_is_rejected() {
        let mut platform = FixedPlatform::new(table(), true);
        let err = platform
            .connect(ConnectConfig::new(DeviceAddress::new("nope")))
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::UnknownDevice(_)));
    }

    #[tokio::test]
    async fn remove_group_without_group_fails() {
        let mut platform = FixedPlatform::new(table(), true);
        let err = platform.remove_group().await.unwrap_err();
        assert_eq!(err.reason(), peerlink_types::FailureReason::Error);
        // Not subscribed: unsubscribe is still fine.
        platform.unsubscribe().await.unwrap();
    }
}
