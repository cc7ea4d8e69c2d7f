//! Translation of platform failure codes into stable symbolic reasons.

use serde::{Deserialize, Serialize};

/// Why the platform rejected a negotiation request.
///
/// The numeric codes follow the platform's action-listener contract. Codes
/// outside the known set are carried through as [`FailureReason::Unknown`]
/// rather than dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    /// Internal platform error.
    Error,
    /// Peer-to-peer is not supported on this device.
    P2pUnsupported,
    /// The framework is busy and cannot service the request.
    Busy,
    /// No service discovery requests were registered.
    NoServiceRequests,
    /// A code this crate does not know about.
    Unknown(i32),
}

impl FailureReason {
    pub const ERROR: i32 = 0;
    pub const P2P_UNSUPPORTED: i32 = 1;
    pub const BUSY: i32 = 2;
    pub const NO_SERVICE_REQUESTS: i32 = 3;

    /// Map a raw platform code to a reason.
    pub fn from_code(code: i32) -> Self {
        match code {
            Self::ERROR => Self::Error,
            Self::P2P_UNSUPPORTED => Self::P2pUnsupported,
            Self::BUSY => Self::Busy,
            Self::NO_SERVICE_REQUESTS => Self::NoServiceRequests,
            other => Self::Unknown(other),
        }
    }

    /// The raw platform code.
    pub fn code(self) -> i32 {
        match self {
            Self::Error => Self::ERROR,
            Self::P2pUnsupported => Self::P2P_UNSUPPORTED,
            Self::Busy => Self::BUSY,
            Self::NoServiceRequests => Self::NO_SERVICE_REQUESTS,
            Self::Unknown(code) => code,
        }
    }
}

impl From<i32> for FailureReason {
    fn from(code: i32) -> Self {
        Self::from_code(code)
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "ERROR"),
            Self::P2pUnsupported => write!(f, "P2P_UNSUPPORTED"),
            Self::Busy => write!(f, "BUSY"),
            Self::NoServiceRequests => write!(f, "NO_SERVICE_REQUESTS"),
            Self::Unknown(code) => write!(f, "UNKNOWN_REASON ({code})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_translate() {
        assert_eq!(FailureReason::from_code(0).to_string(), "ERROR");
        assert_eq!(FailureReason::from_code(1).to_string(), "P2P_UNSUPPORTED");
        assert_eq!(FailureReason::from_code(2).to_string(), "BUSY");
        assert_eq!(
            FailureReason::from_code(3).to_string(),
            "NO_SERVICE_REQUESTS"
        );
    }

    #[test]
    fn unknown_code_keeps_value() {
        let reason = FailureReason::from_code(42);
        assert_eq!(reason, FailureReason::Unknown(42));
        assert_eq!(reason.to_string(), "UNKNOWN_REASON (42)");
        assert_eq!(reason.code(), 42);
    }

    #[test]
    fn negative_code_is_unknown() {
        assert_eq!(
            FailureReason::from(-1).to_string(),
            "UNKNOWN_REASON (-1)"
        );
    }
}
