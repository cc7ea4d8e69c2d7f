//! Platform errors.

use peerlink_types::FailureReason;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("request rejected: {0}")]
    Rejected(FailureReason),

    #[error("no peer with address {0}")]
    UnknownDevice(String),

    #[error("backend not available on this platform")]
    Unavailable,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PlatformError {
    /// Symbolic reason for reporting. Faults that are not platform
    /// rejections collapse to the generic `ERROR` reason.
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::Rejected(reason) => *reason,
            Self::UnknownDevice(_) | Self::Unavailable | Self::Other(_) => FailureReason::Error,
        }
    }
}

impl From<FailureReason> for PlatformError {
    fn from(reason: FailureReason) -> Self {
        Self::Rejected(reason)
    }
}
