//! Shared types for peerlink.
//!
//! This crate contains the data model shared across the peerlink workspace:
//! discovered peers, group formation info, link roles, connection states,
//! platform failure reasons, and the events delivered to the UI listener.

pub mod event;
pub mod link;
pub mod peer;
pub mod reason;

pub use event::{status, OutboundEvent};
pub use link::{ConnectionState, LinkRole};
pub use peer::{ConnectionInfo, DeviceAddress, Peer};
pub use reason::FailureReason;
