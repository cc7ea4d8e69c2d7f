//! Caller-facing handle to a running [`LinkNegotiator`](crate::LinkNegotiator).

use peerlink_types::OutboundEvent;
use tokio::sync::{mpsc, oneshot, watch};

use crate::emitter::EventEmitter;
use crate::error::LinkError;
use crate::negotiator::{LinkCommand, LinkStatus, Reply};

/// Cheap to clone; every clone talks to the same negotiator.
#[derive(Clone)]
pub struct LinkHandle {
    commands: mpsc::Sender<LinkCommand>,
    emitter: EventEmitter,
    status: watch::Receiver<LinkStatus>,
}

impl LinkHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<LinkCommand>,
        emitter: EventEmitter,
        status: watch::Receiver<LinkStatus>,
    ) -> Self {
        Self {
            commands,
            emitter,
            status,
        }
    }

    async fn request(
        &self,
        build: impl FnOnce(Reply) -> LinkCommand,
    ) -> Result<String, LinkError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| LinkError::Closed)?;
        rx.await.map_err(|_| LinkError::Closed)?
    }

    pub async fn start_discovery(&self) -> Result<String, LinkError> {
        self.request(LinkCommand::StartDiscovery).await
    }

    pub async fn stop_discovery(&self) -> Result<String, LinkError> {
        self.request(LinkCommand::StopDiscovery).await
    }

    /// Connect to the peer listed as `name` (a device address also works).
    pub async fn connect_to_peer(&self, name: impl Into<String>) -> Result<String, LinkError> {
        let name = name.into();
        self.request(|reply| LinkCommand::ConnectToPeer { name, reply })
            .await
    }

    pub async fn disconnect(&self) -> Result<String, LinkError> {
        self.request(LinkCommand::Disconnect).await
    }

    /// Send one line to the linked peer.
    pub async fn send_message(&self, text: impl Into<String>) -> Result<String, LinkError> {
        let text = text.into();
        self.request(|reply| LinkCommand::SendMessage { text, reply })
            .await
    }

    pub async fn resume(&self) -> Result<String, LinkError> {
        self.request(LinkCommand::Resume).await
    }

    pub async fn pause(&self) -> Result<String, LinkError> {
        self.request(LinkCommand::Pause).await
    }

    /// Stop the negotiator and wait until cleanup has finished. Succeeds if
    /// it already stopped.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(LinkCommand::Shutdown(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Become the event listener, replacing any previous one.
    pub fn listen(&self) -> mpsc::UnboundedReceiver<OutboundEvent> {
        self.emitter.subscribe()
    }

    pub fn attach_listener(&self, listener: mpsc::UnboundedSender<OutboundEvent>) {
        self.emitter.attach(listener);
    }

    /// Remove the listener. Returns whether one was installed.
    pub fn cancel_listener(&self) -> bool {
        self.emitter.cancel()
    }

    /// Latest published snapshot.
    pub fn status(&self) -> LinkStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn watch_status(&self) -> watch::Receiver<LinkStatus> {
        self.status.clone()
    }
}
