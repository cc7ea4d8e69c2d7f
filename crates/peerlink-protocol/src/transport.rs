//! TCP transport: bind, accept, and connect.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::connection::{self, LineReceiver, LineSender};
use crate::error::ProtocolError;

/// Well-known data port used by both peers.
pub const DEFAULT_DATA_PORT: u16 = 8888;

/// Listening socket on the group owner side.
///
/// Only a single peer is ever accepted per listener.
pub struct LineListener {
    listener: TcpListener,
}

impl LineListener {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr) -> Result<Self, ProtocolError> {
        let listener = TcpListener::bind(addr).await.map_err(ProtocolError::Bind)?;
        info!(addr = %addr, "data listener bound");
        Ok(Self { listener })
    }

    /// Wait for the peer's inbound connection.
    pub async fn accept(&self) -> Result<(LineSender, LineReceiver, SocketAddr), ProtocolError> {
        let (stream, remote) = self.listener.accept().await.map_err(ProtocolError::Accept)?;
        debug!(remote = %remote, "accepted data connection");
        let (tx, rx) = connection::split(stream);
        Ok((tx, rx, remote))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ProtocolError> {
        self.listener.local_addr().map_err(ProtocolError::Bind)
    }
}

/// Connect to the group owner's data port.
pub async fn connect(
    addr: SocketAddr,
    timeout: Duration,
) -> Result<(LineSender, LineReceiver), ProtocolError> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| {
            ProtocolError::Connection(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("connect to {addr} timed out"),
            ))
        })?
        .map_err(ProtocolError::Connection)?;
    stream.set_nodelay(true).map_err(ProtocolError::Connection)?;
    debug!(remote = %addr, "connected to data port");
    Ok(connection::split(stream))
}
