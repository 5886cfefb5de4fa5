//! Ping/Pong Demo
//!
//! Opens a PacketServer on an ephemeral port, connects a client to it, and
//! echoes every packet the server receives back to its sender.

use std::time::Duration;

use packethub::{Config, PacketServer, ServerEvent};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::sleep;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let mut config = Config::default();
    config.server.bind_addr = "127.0.0.1:0".parse()?;

    let mut server = PacketServer::new(config);
    let mut events = server.subscribe();

    if !server.open().await {
        anyhow::bail!("server failed to open");
    }
    let server_addr = server
        .local_addr()
        .ok_or_else(|| anyhow::anyhow!("server address missing"))?;
    println!("Server listening on {}", server_addr);

    // A peer that sends a few pings and prints what comes back
    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(server_addr).await?;
        let mut response = [0u8; 64];

        for i in 0..3 {
            stream.write_all(format!("ping {}", i).as_bytes()).await?;
            let n = stream.read(&mut response).await?;
            println!("client got: {}", String::from_utf8_lossy(&response[..n]));
            sleep(Duration::from_millis(100)).await;
        }

        Ok::<_, anyhow::Error>(())
    });

    // Echo received packets back to their sender until all pings are served
    let mut pings_echoed = 0;
    while pings_echoed < 3 {
        match events.recv().await {
            Some(ServerEvent::Message { kind, text }) => {
                println!("[{}] {}", kind, text);
            }
            Some(ServerEvent::ClientAccepted { addr }) => {
                println!("accept event for {}", addr);
            }
            Some(ServerEvent::PacketReceived { addr, data }) => {
                println!(
                    "server got {:?} from {}",
                    String::from_utf8_lossy(&data),
                    addr
                );
                server.send(&data, addr).await;
                pings_echoed += 1;
            }
            Some(ServerEvent::ConnectionFailure { addr }) => {
                println!("connection to {} failed", addr);
            }
            None => break,
        }
    }

    client.await??;

    let stats = server.stats().await;
    println!(
        "Served {} packets from {} accepted client(s)",
        pings_echoed, stats.total_accepted
    );

    server.close().await;
    println!("Server closed");

    Ok(())
}
