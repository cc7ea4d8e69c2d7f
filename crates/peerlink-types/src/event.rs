//! Events delivered to the UI listener.
//!
//! Each event renders as a `{type, data}` record:
//!
//! | type | data |
//! |---|---|
//! | `connection_status_changed` | `{status}` |
//! | `peers_updated` | `{peers: [..]}` |
//! | `message_received` | `{message}` |
//! | `error` | `{message}` |

use serde::{Deserialize, Serialize};

/// Status strings carried by [`OutboundEvent::StatusChanged`].
pub mod status {
    pub const DISCOVERY_STARTED: &str = "Discovery started";
    pub const DISCOVERY_STOPPED: &str = "Discovery stopped";
    pub const CONNECTION_INITIATED: &str = "Connection initiated";
    pub const CONNECTED: &str = "Connected";
    pub const WAITING_FOR_CLIENT: &str = "Waiting for client...";
    pub const CONNECTED_GROUP_OWNER: &str = "Connected (Group Owner)";
    pub const CONNECTED_CLIENT: &str = "Connected (Client)";
    pub const DISCONNECTED: &str = "Disconnected";
    pub const P2P_ENABLED: &str = "Wi-Fi P2P Enabled";
    pub const P2P_DISABLED: &str = "Wi-Fi P2P Disabled";
}

/// A notification for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    #[serde(rename = "connection_status_changed")]
    StatusChanged { status: String },
    PeersUpdated { peers: Vec<String> },
    MessageReceived { message: String },
    Error { message: String },
}

impl OutboundEvent {
    pub fn status(status: impl Into<String>) -> Self {
        Self::StatusChanged {
            status: status.into(),
        }
    }

    pub fn peers(peers: Vec<String>) -> Self {
        Self::PeersUpdated { peers }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::MessageReceived {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Wire name of this event's type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StatusChanged { .. } => "connection_status_changed",
            Self::PeersUpdated { .. } => "peers_updated",
            Self::MessageReceived { .. } => "message_received",
            Self::Error { .. } => "error",
        }
    }

    /// Render as a `{type, data}` JSON record.
    pub fn to_json(&self) -> serde_json::Value {
        // Derived Serialize on a plain enum of strings cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
