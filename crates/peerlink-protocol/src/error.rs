//! Protocol and transport errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("bind failed: {0}")]
    Bind(std::io::Error),

    #[error("accept failed: {0}")]
    Accept(std::io::Error),

    #[error("connection failed: {0}")]
    Connection(std::io::Error),

    #[error("line of {len} bytes exceeds maximum {max}")]
    LineTooLong { len: usize, max: usize },

    #[error("message contains a line break")]
    EmbeddedNewline,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
