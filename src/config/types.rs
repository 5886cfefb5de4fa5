//! Configuration Types

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address the listening socket binds to
    pub bind_addr: SocketAddr,
    /// Listen backlog handed to the OS
    pub backlog: u32,
    /// Size in bytes of the receive buffer each connection reuses across reads
    pub recv_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "0.0.0.0:7200".parse().unwrap(),
                backlog: 50,
                recv_buffer_size: 4096,
            },
        }
    }
}
