//! PacketHub Library
//!
//! Event-driven multi-client TCP packet server.
//!
//! Accepts inbound connections, reads raw byte packets asynchronously from
//! each peer, and lets the owning application push packets back to a
//! specific connected endpoint. Everything the server observes is published
//! as events on a subscription bus; callers receive raw byte chunks exactly
//! as delivered by the transport, with no framing on top.

pub mod config;
pub mod connection;
pub mod event;
pub mod server;

pub use config::Config;
pub use connection::{ClientRegistry, RemoteClient};
pub use event::{EventBus, EventStream, MessageKind, ServerEvent};
pub use server::{PacketServer, ServerStats};

/// Common error type for the library
pub type Result<T> = anyhow::Result<T>;
