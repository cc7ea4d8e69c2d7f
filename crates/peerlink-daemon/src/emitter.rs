//! Single-listener event delivery.
//!
//! The listener is an unbounded channel owned by the UI side. Producers
//! (the negotiator task, socket tasks) push into it without blocking and
//! never run listener code; the listener drains it on its own task.

use std::sync::{Arc, Mutex, PoisonError};

use peerlink_types::OutboundEvent;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::LinkError;

type Listener = mpsc::UnboundedSender<OutboundEvent>;

/// Delivers events to at most one listener. Clones share the same slot.
#[derive(Clone, Default)]
pub struct EventEmitter {
    slot: Arc<Mutex<Option<Listener>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Listener>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install `listener`, replacing any previous one.
    pub fn attach(&self, listener: Listener) {
        if self.slot().replace(listener).is_some() {
            debug!("replaced event listener");
        } else {
            debug!("attached event listener");
        }
    }

    /// Create a fresh channel, install its sender, and return the receiver.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<OutboundEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.attach(tx);
        rx
    }

    /// Remove the listener. Returns whether one was installed.
    pub fn cancel(&self) -> bool {
        let had = self.slot().take().is_some();
        debug!(had, "cancelled event listener");
        had
    }

    pub fn has_listener(&self) -> bool {
        self.slot().is_some()
    }

    /// Deliver `event` to the listener, or drop it if there is none.
    pub fn emit(&self, event: OutboundEvent) {
        let mut slot = self.slot();
        let Some(listener) = slot.as_ref() else {
            trace!(kind = event.kind(), "no listener, dropping event");
            return;
        };
        if listener.send(event).is_err() {
            debug!("listener went away, clearing slot");
            *slot = None;
        }
    }

    pub fn status(&self, status: &str) {
        self.emit(OutboundEvent::status(status));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(OutboundEvent::error(message));
    }

    /// Emit the `error` event for a failed request and hand the error back
    /// for the direct reply.
    pub fn report(&self, err: LinkError) -> LinkError {
        self.error(err.event_message());
        err
    }
}
