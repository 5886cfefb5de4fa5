//! Server Events and Subscription Bus
//!
//! This module defines the notifications a `PacketServer` emits while it runs
//! and the bus that fans them out to subscribers. Emission with no subscribers
//! registered is a no-op, so emitting call sites never need to guard.

use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc;

/// Classification attached to every status notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Routine status line
    Message,
    /// Expected failure of a caller action, such as sending to an unknown address
    Err,
    /// An underlying I/O operation faulted
    Exception,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            MessageKind::Message => "MESSAGE",
            MessageKind::Err => "ERR",
            MessageKind::Exception => "EXCEPTION",
        };
        write!(f, "{}", tag)
    }
}

/// Notifications emitted by the server and its connections
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Status or diagnostic line
    Message { kind: MessageKind, text: String },
    /// A transport was accepted, fired before any connection state exists for it
    ClientAccepted { addr: SocketAddr },
    /// One inbound data unit read from a connection
    PacketReceived { addr: SocketAddr, data: Bytes },
    /// A write to the connection failed
    ConnectionFailure { addr: SocketAddr },
}

/// Receiving end of one subscription, created by [`EventBus::subscribe`].
///
/// Events queue without bound until received, so slow consumers never cause
/// loss. Dropping the stream unsubscribes it; the bus prunes the dead slot on
/// its next emission.
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<ServerEvent>,
}

impl EventStream {
    /// Wait for the next event. Returns `None` once every bus handle is gone.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.receiver.recv().await
    }

    /// Take the next event only if one is already queued.
    pub fn try_recv(&mut self) -> Option<ServerEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Fan-out bus for [`ServerEvent`] notifications.
///
/// Cheap to clone; clones share the same subscriber list.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<ServerEvent>>>>,
}

impl EventBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber and return its event stream.
    pub fn subscribe(&self) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        EventStream { receiver: rx }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    /// Deliver an event to every subscriber, pruning closed ones.
    pub fn emit(&self, event: ServerEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Emit a status line with the given kind.
    pub fn message(&self, kind: MessageKind, text: impl Into<String>) {
        self.emit(ServerEvent::Message {
            kind,
            text: text.into(),
        });
    }
}
