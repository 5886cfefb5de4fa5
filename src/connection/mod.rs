//! Connection Module
//!
//! Handles accepted TCP connections: per-peer receive loops, explicit
//! sends, and the shared registry of live clients.

pub mod client;
pub mod registry;

pub use client::RemoteClient;
pub use registry::ClientRegistry;
