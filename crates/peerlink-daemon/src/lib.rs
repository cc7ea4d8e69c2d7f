//! Core link engine for peerlink.
//!
//! Implements the negotiation state machine that turns platform discovery and
//! group-formation callbacks into a single line-oriented socket session, and
//! delivers status, peer, message, and error notifications to one external
//! listener.

pub mod config;
pub mod directory;
pub mod emitter;
pub mod error;
pub mod handle;
pub mod negotiator;
pub mod pool;
pub mod session;
pub mod setup;

pub use config::Config;
pub use directory::PeerDirectory;
pub use emitter::EventEmitter;
pub use error::LinkError;
pub use handle::LinkHandle;
pub use negotiator::{LinkCommand, LinkNegotiator, LinkStatus};
pub use session::{SessionNotice, SessionSettings, SocketSession};
