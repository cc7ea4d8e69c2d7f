//! Socket session: the single data connection between linked peers.
//!
//! A session is created when the link role resolves. The host binds the data
//! port and accepts exactly one peer; the client connects out to the group
//! owner. Both then run a read loop that turns each received line into a
//! `message_received` event. All socket work runs on the worker pool.
//!
//! Every establishment gets a fresh session id. Background tasks carry the
//! id they were started for and only ever tear down that session, so a task
//! that outlives its session cannot close a newer one.

use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use peerlink_protocol::{LineListener, LineReceiver, LineSender, ProtocolError};
use peerlink_types::{status, LinkRole, OutboundEvent};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use crate::emitter::EventEmitter;
use crate::error::LinkError;
use crate::pool::WorkerPool;

/// Reported by session tasks to the negotiator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// The host listener is bound and waiting for the peer.
    Listening { id: u64, addr: SocketAddr },
    /// The data socket is up.
    Established { id: u64, role: LinkRole },
    /// The session ended and was torn down.
    Closed { id: u64 },
}

/// Socket parameters for a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Host listener address; its port is also the client's target port.
    pub bind: SocketAddr,
    pub connect_timeout: Duration,
}

#[derive(Default)]
struct Slot {
    /// Id of the live session, 0 when there is none.
    id: u64,
    next_id: u64,
    role: LinkRole,
    peer_address: Option<IpAddr>,
    writer: Option<Arc<tokio::sync::Mutex<LineSender>>>,
    tasks: Vec<AbortHandle>,
}

impl Slot {
    /// Close everything and reset. Returns whether anything was open.
    fn release(&mut self) -> bool {
        let was_open = self.id != 0 || self.writer.is_some() || !self.tasks.is_empty();
        self.id = 0;
        self.role = LinkRole::Unresolved;
        self.peer_address = None;
        self.writer = None;
        for task in self.tasks.drain(..) {
            task.abort();
        }
        was_open
    }
}

struct Inner {
    slot: Mutex<Slot>,
    settings: SessionSettings,
    emitter: EventEmitter,
    pool: Arc<WorkerPool>,
    notices: mpsc::UnboundedSender<SessionNotice>,
}

/// Owner of the data socket. Clones share the same session.
#[derive(Clone)]
pub struct SocketSession {
    inner: Arc<Inner>,
}

impl SocketSession {
    pub fn new(
        settings: SessionSettings,
        emitter: EventEmitter,
        pool: Arc<WorkerPool>,
        notices: mpsc::UnboundedSender<SessionNotice>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(Slot::default()),
                settings,
                emitter,
                pool,
                notices,
            }),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn role(&self) -> LinkRole {
        self.slot().role
    }

    /// Group owner address (client) or remote socket address (host).
    pub fn peer_address(&self) -> Option<IpAddr> {
        self.slot().peer_address
    }

    /// Whether a data socket is ready for sending.
    pub fn is_connected(&self) -> bool {
        self.slot().writer.is_some()
    }

    pub fn current_id(&self) -> Option<u64> {
        match self.slot().id {
            0 => None,
            id => Some(id),
        }
    }

    /// Start a host session: bind, accept one peer, then read.
    pub fn establish_as_host(&self) -> Result<u64, LinkError> {
        let id = self.begin(LinkRole::Host, None);
        let session = self.clone();
        let handle = self.inner.pool.spawn(session.run_host(id));
        self.track(id, handle)?;
        Ok(id)
    }

    /// Start a client session: connect to the group owner, then read.
    pub fn establish_as_client(&self, owner: IpAddr) -> Result<u64, LinkError> {
        let id = self.begin(LinkRole::Client, Some(owner));
        let session = self.clone();
        let handle = self.inner.pool.spawn(session.run_client(id, owner));
        self.track(id, handle)?;
        Ok(id)
    }

    /// Write one line to the peer.
    pub async fn send_message(&self, text: &str) -> Result<(), LinkError> {
        let writer = self.slot().writer.clone();
        let Some(writer) = writer else {
            return Err(self.inner.emitter.report(LinkError::NotConnected));
        };

        let mut writer = writer.lock().await;
        match writer.send(text).await {
            Ok(()) => {
                debug!(len = text.len(), "message sent");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "send failed");
                Err(self
                    .inner
                    .emitter
                    .report(LinkError::SendFailed(e.to_string())))
            }
        }
    }

    /// Close the data and listening sockets and reset the role. Safe to call
    /// at any time; returns whether anything was open.
    pub fn teardown(&self) -> bool {
        let closed = self.slot().release();
        if closed {
            info!("session torn down");
        }
        closed
    }

    /// Tear down only if `id` is still the live session.
    fn teardown_session(&self, id: u64) -> bool {
        let mut slot = self.slot();
        if id == 0 || slot.id != id {
            return false;
        }
        slot.release();
        true
    }

    /// Release any previous session and claim a new id.
    fn begin(&self, role: LinkRole, peer_address: Option<IpAddr>) -> u64 {
        let mut slot = self.slot();
        if slot.release() {
            debug!("closed previous session before establishing a new one");
        }
        slot.next_id += 1;
        slot.id = slot.next_id;
        slot.role = role;
        slot.peer_address = peer_address;
        info!(id = slot.id, %role, "establishing session");
        slot.id
    }

    fn track(&self, id: u64, handle: Option<AbortHandle>) -> Result<(), LinkError> {
        let Some(handle) = handle else {
            self.teardown_session(id);
            return Err(LinkError::Closed);
        };
        let mut slot = self.slot();
        if slot.id == id {
            slot.tasks.push(handle);
        } else {
            handle.abort();
        }
        Ok(())
    }

    /// Install the writer for session `id`. Returns `false` if the session
    /// was torn down or replaced meanwhile.
    fn activate(&self, id: u64, writer: LineSender, remote: IpAddr) -> bool {
        let mut slot = self.slot();
        if slot.id != id {
            debug!(id, "session superseded, dropping socket");
            return false;
        }
        slot.writer = Some(Arc::new(tokio::sync::Mutex::new(writer)));
        slot.peer_address = Some(remote);
        true
    }

    fn notify(&self, notice: SessionNotice) {
        // The negotiator may already be gone during shutdown.
        let _ = self.inner.notices.send(notice);
    }

    async fn run_host(self, id: u64) {
        let bind = self.inner.settings.bind;
        let listener = match LineListener::bind(bind).await {
            Ok(listener) => listener,
            Err(e) => return self.establish_failed(id, "Server error", e),
        };
        if let Ok(addr) = listener.local_addr() {
            self.notify(SessionNotice::Listening { id, addr });
        }
        info!(addr = %bind, "waiting for client");
        self.inner.emitter.status(status::WAITING_FOR_CLIENT);

        let (writer, reader, remote) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => return self.establish_failed(id, "Server error", e),
        };
        // Single peer: stop listening once it is in.
        drop(listener);

        if !self.activate(id, writer, remote.ip()) {
            return;
        }
        info!(remote = %remote, "client connected");
        self.inner.emitter.status(status::CONNECTED_GROUP_OWNER);
        self.notify(SessionNotice::Established {
            id,
            role: LinkRole::Host,
        });
        self.start_read_loop(id, reader);
    }

    async fn run_client(self, id: u64, owner: IpAddr) {
        let target = SocketAddr::new(owner, self.inner.settings.bind.port());
        let timeout = self.inner.settings.connect_timeout;
        let (writer, reader) = match peerlink_protocol::connect(target, timeout).await {
            Ok(pair) => pair,
            Err(e) => return self.establish_failed(id, "Client error", e),
        };

        if !self.activate(id, writer, owner) {
            return;
        }
        info!(remote = %target, "connected to group owner");
        self.inner.emitter.status(status::CONNECTED_CLIENT);
        self.notify(SessionNotice::Established {
            id,
            role: LinkRole::Client,
        });
        self.start_read_loop(id, reader);
    }

    fn establish_failed(&self, id: u64, context: &'static str, source: ProtocolError) {
        error!(id, error = %source, "{context}");
        if !self.teardown_session(id) {
            return;
        }
        self.inner
            .emitter
            .report(LinkError::Socket { context, source });
        self.notify(SessionNotice::Closed { id });
    }

    fn start_read_loop(&self, id: u64, reader: LineReceiver) {
        let session = self.clone();
        let handle = self.inner.pool.spawn(session.read_loop(id, reader));
        if self.track(id, handle).is_err() {
            debug!(id, "worker pool closed before read loop started");
        }
    }

    async fn read_loop(self, id: u64, mut reader: LineReceiver) {
        loop {
            match reader.recv().await {
                Ok(Some(line)) => {
                    debug!(len = line.len(), "message received");
                    self.inner.emitter.emit(OutboundEvent::message(line));
                }
                Ok(None) => {
                    info!(id, "peer closed the data stream");
                    break;
                }
                Err(e) => {
                    warn!(id, error = %e, "read failed");
                    self.inner.emitter.report(LinkError::Socket {
                        context: "Message read error",
                        source: e,
                    });
                    break;
                }
            }
        }

        if self.teardown_session(id) {
            self.inner.emitter.status(status::DISCONNECTED);
            self.notify(SessionNotice::Closed { id });
        }
    }
}
