//! Line-delimited TCP transport for peerlink.
//!
//! This crate handles the data socket between two linked peers: binding the
//! host's listener, connecting from the client, and exchanging
//! newline-terminated UTF-8 text lines.

pub mod connection;
pub mod error;
pub mod transport;
pub mod wire;

pub use connection::{LineReceiver, LineSender};
pub use error::ProtocolError;
pub use transport::{connect, LineListener, DEFAULT_DATA_PORT};
