//! Link errors.

use peerlink_types::FailureReason;
use thiserror::Error;

/// Failure of a caller-facing link operation.
///
/// `Display` is the human-readable message returned to the caller;
/// [`LinkError::code`] is the stable symbolic code.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Discovery failed: {0}")]
    DiscoveryFailed(FailureReason),

    #[error("Stop discovery failed: {0}")]
    StopDiscoveryFailed(FailureReason),

    #[error("Selected peer not found: {0}")]
    PeerNotFound(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(FailureReason),

    #[error("Failed to disconnect: {0}")]
    DisconnectFailed(FailureReason),

    #[error("Not connected to a peer.")]
    NotConnected,

    #[error("Failed to send message: {0}")]
    SendFailed(String),

    /// Accept, connect, or read fault on the data socket.
    #[error("{context}: {source}")]
    Socket {
        context: &'static str,
        #[source]
        source: peerlink_protocol::ProtocolError,
    },

    #[error("platform error: {0}")]
    Platform(#[from] peerlink_platform::PlatformError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("link negotiator is not running")]
    Closed,
}

impl LinkError {
    /// Stable symbolic code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DiscoveryFailed(_) => "DISCOVERY_FAILED",
            Self::StopDiscoveryFailed(_) => "STOP_DISCOVERY_FAILED",
            Self::PeerNotFound(_) => "PEER_NOT_FOUND",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::DisconnectFailed(_) => "DISCONNECT_FAILED",
            Self::NotConnected => "NOT_CONNECTED",
            Self::SendFailed(_) => "SEND_FAILED",
            Self::Socket { .. } => "SOCKET_ERROR",
            Self::Platform(_) => "PLATFORM_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Closed => "LINK_CLOSED",
        }
    }

    /// Text carried by the `error` event for this failure.
    pub fn event_message(&self) -> String {
        match self {
            Self::NotConnected => "Cannot send message: not connected.".to_string(),
            Self::SendFailed(detail) => format!("Send message error: {detail}"),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            LinkError::DiscoveryFailed(FailureReason::Busy).code(),
            "DISCOVERY_FAILED"
        );
        assert_eq!(LinkError::PeerNotFound("x".into()).code(), "PEER_NOT_FOUND");
        assert_eq!(LinkError::NotConnected.code(), "NOT_CONNECTED");
        assert_eq!(LinkError::SendFailed("eof".into()).code(), "SEND_FAILED");
    }

    #[test]
    fn messages_carry_translated_reason() {
        let err = LinkError::ConnectionFailed(FailureReason::from_code(9));
        assert_eq!(err.to_string(), "Connection failed: UNKNOWN_REASON (9)");
        assert_eq!(err.event_message(), err.to_string());
    }

    #[test]
    fn socket_errors_carry_their_context() {
        let err = LinkError::Socket {
            context: "Server error",
            source: peerlink_protocol::ProtocolError::EmbeddedNewline,
        };
        assert_eq!(err.code(), "SOCKET_ERROR");
        assert!(err.to_string().starts_with("Server error: "));
        assert_eq!(err.event_message(), err.to_string());
    }

    #[test]
    fn send_errors_have_distinct_event_text() {
        assert_eq!(
            LinkError::NotConnected.event_message(),
            "Cannot send message: not connected."
        );
        assert_eq!(
            LinkError::SendFailed("broken pipe".into()).event_message(),
            "Send message error: broken pipe"
        );
    }
}
