//! Packet Server Implementation

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::connection::{ClientRegistry, RemoteClient};
use crate::event::{EventBus, EventStream, MessageKind, ServerEvent};

/// Lifecycle states. There is no way back to Open once closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerState {
    Created,
    Open,
    Closed,
}

/// Event driven multi client TCP server.
///
/// Accepts inbound connections, reads raw byte packets from each peer and
/// lets the owning application push packets back to a specific peer.
/// Everything the server observes is published on its event bus; subscribe
/// before calling [`open`](PacketServer::open) to see the startup messages.
pub struct PacketServer {
    config: Config,
    state: ServerState,
    registry: ClientRegistry,
    events: EventBus,
    local_addr: Option<SocketAddr>,
    total_accepted: Arc<AtomicUsize>,
    shutdown_tx: broadcast::Sender<()>,
    accept_task: Option<JoinHandle<()>>,
}

impl PacketServer {
    /// Create a server in the Created state. No socket work happens here.
    pub fn new(config: Config) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            state: ServerState::Created,
            registry: ClientRegistry::new(),
            events: EventBus::new(),
            local_addr: None,
            total_accepted: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
            accept_task: None,
        }
    }

    /// Register an event subscriber. May be called any number of times,
    /// before or after `open`.
    pub fn subscribe(&self) -> EventStream {
        self.events.subscribe()
    }

    /// Bind the listener and start accepting clients. Returns true once the
    /// accept loop is running.
    ///
    /// Only legal in the Created state; calling while open or after close
    /// is a user error reported as `ERR`. A bind or listen fault is
    /// reported as `EXCEPTION` and leaves the server in Created, so the
    /// caller may fix the configuration and try again.
    pub async fn open(&mut self) -> bool {
        match self.state {
            ServerState::Created => {}
            ServerState::Open => {
                warn!("open() called on a server that is already open");
                self.events
                    .message(MessageKind::Err, "server is already open");
                return false;
            }
            ServerState::Closed => {
                warn!("open() called on a closed server");
                self.events.message(MessageKind::Err, "server is closed");
                return false;
            }
        }

        let listener = match self.bind_listener() {
            Ok(listener) => listener,
            Err(e) => {
                error!(
                    "Failed to open server on {}: {}",
                    self.config.server.bind_addr, e
                );
                self.events.message(MessageKind::Exception, e.to_string());
                return false;
            }
        };

        self.local_addr = listener.local_addr().ok();
        let announced = self
            .local_addr
            .unwrap_or(self.config.server.bind_addr);

        self.spawn_accept_loop(listener);
        self.state = ServerState::Open;

        info!("Server open on {}", announced);
        self.events
            .message(MessageKind::Message, format!("{}: server open", announced));
        true
    }

    /// Bind and listen with the configured backlog. Errors are returned for
    /// the caller to report.
    fn bind_listener(&self) -> io::Result<TcpListener> {
        let bind_addr = self.config.server.bind_addr;
        let socket = if bind_addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(bind_addr)?;
        socket.listen(self.config.server.backlog)
    }

    /// Main connection acceptance loop, spawned once per successful `open`.
    fn spawn_accept_loop(&mut self, listener: TcpListener) {
        let registry = self.registry.clone();
        let events = self.events.clone();
        let total_accepted = Arc::clone(&self.total_accepted);
        let recv_buffer_size = self.config.server.recv_buffer_size;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let task = tokio::spawn(async move {
            info!("Starting connection acceptance loop");

            loop {
                tokio::select! {
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, addr)) => {
                                debug!("Accepted connection from {}", addr);
                                total_accepted.fetch_add(1, Ordering::Relaxed);

                                events.message(
                                    MessageKind::Message,
                                    format!("accepted: {}", addr),
                                );
                                events.emit(ServerEvent::ClientAccepted { addr });

                                match RemoteClient::open(stream, events.clone(), recv_buffer_size) {
                                    Ok(client) => {
                                        if let Some(stale) = registry.insert(client).await {
                                            debug!(
                                                "Replaced stale registry entry for {}",
                                                stale.addr()
                                            );
                                        }
                                        events.message(
                                            MessageKind::Message,
                                            format!("connected: {}", addr),
                                        );
                                    }
                                    Err(e) => {
                                        warn!("Client {} went away during setup: {}", addr, e);
                                        events.message(
                                            MessageKind::Exception,
                                            format!("{}: {}", addr, e),
                                        );
                                    }
                                }
                            }
                            Err(e) => {
                                error!("Error accepting connection: {}", e);
                                events.message(MessageKind::Exception, e.to_string());
                                // Keep accepting even if one accept fails
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Received shutdown signal, stopping connection acceptance");
                        break;
                    }
                }
            }

            info!("Connection acceptance loop stopped");
            // The listener drops here, releasing the accept socket
        });

        self.accept_task = Some(task);
    }

    /// Close every registered client, then stop accepting.
    ///
    /// Faults while closing one client are reported as `EXCEPTION` and do
    /// not stop the remaining closes. Idempotent; a second call does
    /// nothing. The server cannot be reopened afterwards.
    pub async fn close(&mut self) {
        if self.state == ServerState::Closed {
            return;
        }
        if self.state == ServerState::Created {
            // Never opened, nothing to tear down
            self.state = ServerState::Closed;
            return;
        }

        info!("Closing server");

        for client in self.registry.snapshot().await {
            client.close().await;
        }

        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal: {}", e);
        }
        if let Some(task) = self.accept_task.take() {
            if let Err(e) = task.await {
                error!("Accept task failed during shutdown: {}", e);
            }
        }

        self.state = ServerState::Closed;
        info!("Server closed");
    }

    /// Send a packet to the peer registered at the destination address.
    ///
    /// An unknown destination is a user error reported as `ERR`, never an
    /// `EXCEPTION`. Transport faults during the write follow the client's
    /// own failure path and come back as false.
    pub async fn send(&self, packet: &[u8], dest: SocketAddr) -> bool {
        match self.registry.get(&dest).await {
            Some(client) => client.send(packet).await,
            None => {
                debug!("Send to unregistered address {}", dest);
                self.events
                    .message(MessageKind::Err, format!("{} is not connected", dest));
                false
            }
        }
    }

    /// Send a text payload, encoded as UTF-8.
    pub async fn send_text(&self, text: &str, dest: SocketAddr) -> bool {
        self.send(text.as_bytes(), dest).await
    }

    /// Send a packet to every registered client, returning how many sends
    /// succeeded. Failures follow the normal per client failure path.
    pub async fn broadcast(&self, packet: &[u8]) -> usize {
        let mut delivered = 0;
        for client in self.registry.snapshot().await {
            if client.send(packet).await {
                delivered += 1;
            }
        }
        delivered
    }

    /// Look up the client registered at an address. `None` means not
    /// found, which is not a fault.
    pub async fn remote_client(&self, addr: SocketAddr) -> Option<Arc<RemoteClient>> {
        self.registry.get(&addr).await
    }

    /// Address the listener is bound to, available once open. Useful when
    /// binding port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Addresses of every registered client.
    pub async fn client_addrs(&self) -> Vec<SocketAddr> {
        self.registry.addrs().await
    }

    /// Counters describing the server's lifetime so far.
    pub async fn stats(&self) -> ServerStats {
        ServerStats {
            registered_clients: self.registry.len().await,
            total_accepted: self.total_accepted.load(Ordering::Relaxed),
        }
    }
}

/// Server statistics
#[derive(Debug, Clone)]
pub struct ServerStats {
    /// Clients currently in the registry, including ones whose peer has
    /// since disconnected
    pub registered_clients: usize,
    /// Transports accepted since the server opened
    pub total_accepted: usize,
}
