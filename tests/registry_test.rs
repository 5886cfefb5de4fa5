//! Tests for the client registry

use std::sync::Arc;

use packethub::{ClientRegistry, EventBus, RemoteClient};
use tokio::net::{TcpListener, TcpStream};

/// Accept one real connection and wrap it in a client. The outbound stream
/// is returned so the peer stays alive for the duration of the test.
async fn accepted_client() -> (Arc<RemoteClient>, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let outbound = TcpStream::connect(addr).await.unwrap();
    let (accepted, _) = listener.accept().await.unwrap();

    let client = RemoteClient::open(accepted, EventBus::new(), 4096).unwrap();
    (client, outbound)
}

#[tokio::test]
async fn test_empty_registry() {
    let registry = ClientRegistry::new();

    assert_eq!(registry.len().await, 0);
    assert!(registry.is_empty().await);
    assert!(registry.addrs().await.is_empty());
    assert!(registry.get(&"127.0.0.1:9999".parse().unwrap()).await.is_none());
}

#[tokio::test]
async fn test_insert_and_exact_lookup() {
    let registry = ClientRegistry::new();
    let (first, _keep_first) = accepted_client().await;
    let (second, _keep_second) = accepted_client().await;

    registry.insert(Arc::clone(&first)).await;
    registry.insert(Arc::clone(&second)).await;

    assert_eq!(registry.len().await, 2);

    let found = registry.get(&first.addr()).await.unwrap();
    assert_eq!(found.addr(), first.addr());

    // Only an exact address match counts
    let mut near_miss = first.addr();
    near_miss.set_port(near_miss.port().wrapping_add(1));
    assert!(registry.get(&near_miss).await.is_none());
}

#[tokio::test]
async fn test_reinsert_returns_stale_entry() {
    let registry = ClientRegistry::new();
    let (client, _keep) = accepted_client().await;

    assert!(registry.insert(Arc::clone(&client)).await.is_none());

    let stale = registry.insert(Arc::clone(&client)).await;
    assert!(stale.is_some());
    assert!(Arc::ptr_eq(&stale.unwrap(), &client));
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn test_entries_survive_client_close() {
    let registry = ClientRegistry::new();
    let (client, _keep) = accepted_client().await;
    let addr = client.addr();

    registry.insert(Arc::clone(&client)).await;
    client.close().await;

    // Closing a client does not reap its registry entry
    assert_eq!(registry.len().await, 1);
    assert!(registry.get(&addr).await.is_some());
}

#[tokio::test]
async fn test_addrs_and_snapshot() {
    let registry = ClientRegistry::new();
    let (first, _keep_first) = accepted_client().await;
    let (second, _keep_second) = accepted_client().await;

    registry.insert(Arc::clone(&first)).await;
    registry.insert(Arc::clone(&second)).await;

    let addrs = registry.addrs().await;
    assert_eq!(addrs.len(), 2);
    assert!(addrs.contains(&first.addr()));
    assert!(addrs.contains(&second.addr()));

    assert_eq!(registry.snapshot().await.len(), 2);
}
