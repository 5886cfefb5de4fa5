//! Client Registry Implementation

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::RemoteClient;

/// Shared mapping from remote address to the client handling that peer.
///
/// Entries are inserted by the accept loop and read by send, lookup and
/// close, which all run concurrently with further accepts. Nothing removes
/// an entry when a peer disconnects or a send fails, so membership records
/// which transports were accepted, not which are still alive.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<RwLock<HashMap<SocketAddr, Arc<RemoteClient>>>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under its remote address, returning any stale
    /// entry that was registered under the same address.
    pub async fn insert(&self, client: Arc<RemoteClient>) -> Option<Arc<RemoteClient>> {
        self.clients.write().await.insert(client.addr(), client)
    }

    /// Look up the client whose remote address matches exactly.
    pub async fn get(&self, addr: &SocketAddr) -> Option<Arc<RemoteClient>> {
        self.clients.read().await.get(addr).cloned()
    }

    /// Addresses of every registered client.
    pub async fn addrs(&self) -> Vec<SocketAddr> {
        self.clients.read().await.keys().copied().collect()
    }

    /// Snapshot of every registered client.
    pub async fn snapshot(&self) -> Vec<Arc<RemoteClient>> {
        self.clients.read().await.values().cloned().collect()
    }

    /// Number of registered clients.
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    /// True when no client has been registered.
    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }
}
