//! Link role and connection state machine types.

use serde::{Deserialize, Serialize};

/// Which side of the data socket this device plays once a group forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinkRole {
    /// No group formed yet, or the last session was torn down.
    #[default]
    Unresolved,
    /// Group owner: listens for the peer's inbound data connection.
    Host,
    /// Group member: connects out to the group owner.
    Client,
}

impl LinkRole {
    /// Role implied by the platform's group-owner flag.
    pub fn from_group_owner(is_group_owner: bool) -> Self {
        if is_group_owner {
            Self::Host
        } else {
            Self::Client
        }
    }

    pub fn is_resolved(self) -> bool {
        self != Self::Unresolved
    }
}

impl std::fmt::Display for LinkRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unresolved => write!(f, "Unresolved"),
            Self::Host => write!(f, "Host"),
            Self::Client => write!(f, "Client"),
        }
    }
}

/// Negotiation state, owned by the link negotiator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Idle,
    /// Platform discovery is running.
    Discovering,
    /// A connect request was accepted by the platform; waiting for the group.
    Connecting,
    /// Group formed; the data socket is being established.
    AwaitingPeer,
    /// Data socket is up.
    Connected,
    /// Group or socket went away.
    Disconnected,
    /// The last platform request failed.
    Failed(String),
}

impl ConnectionState {
    /// Whether a group exists, regardless of the socket.
    pub fn is_linked(&self) -> bool {
        matches!(self, Self::AwaitingPeer | Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Discovering => write!(f, "Discovering"),
            Self::Connecting => write!(f, "Connecting"),
            Self::AwaitingPeer => write!(f, "AwaitingPeer"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Failed(reason) => write!(f, "Failed({reason})"),
        }
    }
}
