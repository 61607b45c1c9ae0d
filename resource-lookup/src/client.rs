use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use tokio::io::AsyncWriteExt;
use tokio::net::UdpSocket;
use tracing::debug;

use crate::cli::ClientArgs;
use crate::config::DEFAULT_MAX_RESPONSE_LEN;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server: SocketAddr,
    /// How long to wait for the reply. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Largest reply accepted. Must be at least the server's
    /// `max_response_len`, or longer replies are reported as an error.
    pub max_response_len: usize,
}

impl ClientConfig {
    pub fn new(server: SocketAddr) -> Self {
        Self {
            server,
            timeout: None,
            max_response_len: DEFAULT_MAX_RESPONSE_LEN,
        }
    }
}

pub async fn run(args: ClientArgs) -> Result<()> {
    let config = ClientConfig::from(&args);
    let reply = request(&config, args.resource.as_bytes()).await?;
    write_stdout(&reply).await?;
    Ok(())
}

/// Sends one request datagram and returns the raw reply text.
pub async fn request(config: &ClientConfig, resource: &[u8]) -> Result<String> {
    let socket = UdpSocket::bind(unspecified_for(config.server))
        .await
        .context("failed to bind client socket")?;
    socket
        .send_to(resource, config.server)
        .await
        .with_context(|| format!("failed to send request to {}", config.server))?;
    debug!(server = %config.server, bytes = resource.len(), "request sent");

    // One spare byte tells a reply that exactly fills the limit apart from
    // one the OS truncated.
    let mut buf = vec![0u8; config.max_response_len + 1];
    let receive = socket.recv_from(&mut buf);
    let (len, from) = match config.timeout {
        Some(limit) => tokio::time::timeout(limit, receive)
            .await
            .with_context(|| format!("no reply from {} within {limit:?}", config.server))?,
        None => receive.await,
    }
    .context("failed to receive reply")?;
    debug!(%from, bytes = len, "reply received");
    ensure!(
        len <= config.max_response_len,
        "reply from {from} is longer than {} bytes; raise --max-response-len",
        config.max_response_len
    );

    Ok(String::from_utf8_lossy(&buf[..len]).into_owned())
}

fn unspecified_for(server: SocketAddr) -> SocketAddr {
    match server {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    }
}

async fn write_stdout(text: &str) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await
}

impl From<&ClientArgs> for ClientConfig {
    fn from(args: &ClientArgs) -> Self {
        Self {
            server: SocketAddr::new(args.host, args.port),
            timeout: args.timeout_ms.map(Duration::from_millis),
            max_response_len: args.max_response_len,
        }
    }
}
