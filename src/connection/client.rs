//! Remote Client Implementation

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::event::{EventBus, MessageKind, ServerEvent};

/// One accepted transport: a receive loop feeding the event bus plus a
/// write half for explicit sends.
pub struct RemoteClient {
    addr: SocketAddr,
    writer: Mutex<Option<OwnedWriteHalf>>,
    receive_task: JoinHandle<()>,
    events: EventBus,
}

impl RemoteClient {
    /// Take ownership of an accepted transport and start receiving from it.
    ///
    /// Fails when the remote address cannot be read, meaning the peer went
    /// away between accept and setup; reporting that fault is the caller's
    /// job.
    pub fn open(
        stream: TcpStream,
        events: EventBus,
        recv_buffer_size: usize,
    ) -> io::Result<Arc<Self>> {
        let addr = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();

        let receive_task = tokio::spawn(Self::receive_loop(
            read_half,
            addr,
            events.clone(),
            recv_buffer_size,
        ));
        debug!("Receive loop started for {}", addr);

        Ok(Arc::new(Self {
            addr,
            writer: Mutex::new(Some(write_half)),
            receive_task,
            events,
        }))
    }

    /// Remote address identifying this client.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Write one packet to the peer. Returns true on success.
    ///
    /// Any transport fault (including writing after close) is reported as an
    /// `EXCEPTION` naming this peer plus a `ConnectionFailure`, and false
    /// comes back. The registry entry is left in place for the caller to
    /// deal with.
    pub async fn send(&self, packet: &[u8]) -> bool {
        match self.write_packet(packet).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Send to {} failed: {}", self.addr, e);
                self.events
                    .message(MessageKind::Exception, format!("{}: {}", self.addr, e));
                self.events
                    .emit(ServerEvent::ConnectionFailure { addr: self.addr });
                false
            }
        }
    }

    /// Write primitive. Errors are returned to the caller, never reported
    /// from here.
    async fn write_packet(&self, packet: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        match writer.as_mut() {
            Some(write_half) => write_half.write_all(packet).await,
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection closed",
            )),
        }
    }

    /// Shut the transport down in both directions and stop the receive loop.
    ///
    /// Idempotent: a second call finds nothing left to close and returns
    /// quietly. Shutdown faults are reported as `EXCEPTION`.
    pub async fn close(&self) {
        let write_half = self.writer.lock().await.take();
        if let Some(mut write_half) = write_half {
            if let Err(e) = write_half.shutdown().await {
                warn!("Shutdown of {} failed: {}", self.addr, e);
                self.events
                    .message(MessageKind::Exception, format!("{}: {}", self.addr, e));
            }
            // Aborting the task drops the read half, releasing the socket
            self.receive_task.abort();
            debug!("Closed connection to {}", self.addr);
        }
    }

    /// Read until the peer goes away.
    ///
    /// Each completed read is copied out of the reused buffer into its own
    /// immutable packet before the next read is issued, so packets from one
    /// peer are emitted in arrival order. A zero byte read means the peer
    /// closed its side; the loop stops without emitting anything. Read
    /// faults are reported as an `EXCEPTION` naming the peer and stop the
    /// loop.
    async fn receive_loop(
        mut read_half: OwnedReadHalf,
        addr: SocketAddr,
        events: EventBus,
        buffer_size: usize,
    ) {
        let mut buffer = vec![0u8; buffer_size];

        loop {
            match read_half.read(&mut buffer).await {
                Ok(0) => {
                    debug!("Peer {} closed the connection", addr);
                    break;
                }
                Ok(n) => {
                    let data = Bytes::copy_from_slice(&buffer[..n]);
                    events.emit(ServerEvent::PacketReceived { addr, data });
                }
                Err(e) => {
                    warn!("Read from {} failed: {}", addr, e);
                    events.message(MessageKind::Exception, format!("{}: {}", addr, e));
                    break;
                }
            }
        }
    }
}
