//! Peer and group formation types.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Opaque hardware address of a peer device as reported by the radio stack.
///
/// The address is the stable key of a peer; display names are not unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceAddress(String);

impl DeviceAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A peer found by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Device address (stable identifier).
    pub address: DeviceAddress,
    /// Human-readable device name (e.g. "Pixel-7").
    pub name: String,
}

impl Peer {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: DeviceAddress::new(address),
            name: name.into(),
        }
    }
}

/// Group formation result reported by the platform once a connect settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Whether a group was formed at all.
    pub group_formed: bool,
    /// Whether this device owns the group (and therefore hosts the socket).
    pub is_group_owner: bool,
    /// Address of the group owner on the link-local network.
    pub group_owner_address: Option<IpAddr>,
}

impl ConnectionInfo {
    /// A formed group in which this device is the owner.
    pub fn owner(address: IpAddr) -> Self {
        Self {
            group_formed: true,
            is_group_owner: true,
            group_owner_address: Some(address),
        }
    }

    /// A formed group in which this device joined `owner` as a client.
    pub fn client_of(owner: IpAddr) -> Self {
        Self {
            group_formed: true,
            is_group_owner: false,
            group_owner_address: Some(owner),
        }
    }
}
