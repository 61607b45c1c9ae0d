use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{Limits, ServerConfig};
use crate::listener::Listener;
use crate::processor::Processor;
use crate::sender::SendLane;
use crate::shutdown::{PendingTracker, StopFlag};
use crate::table::ResourceTable;

/// What a server did between start and drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServeReport {
    /// Datagrams the listener accepted. Each one was answered or logged as
    /// undeliverable before `run_until` returned.
    pub accepted: u64,
}

pub struct Server {
    socket: Arc<UdpSocket>,
    table: Arc<ResourceTable>,
    limits: Limits,
}

impl Server {
    pub async fn bind(config: &ServerConfig, table: ResourceTable) -> Result<Self> {
        let socket = UdpSocket::bind(config.bind)
            .await
            .with_context(|| format!("failed to bind {}", config.bind))?;

        for name in table.unreachable_names(config.limits.max_name_len) {
            warn!(
                name = %String::from_utf8_lossy(name),
                limit = config.limits.max_name_len,
                "resource name is longer than any accepted request"
            );
        }

        Ok(Self {
            socket: Arc::new(socket),
            table: Arc::new(table),
            limits: config.limits,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serves requests until `shutdown` resolves, then drains.
    ///
    /// Teardown order: stop issuing receives, wait for the listener to exit,
    /// wait for every accepted session to finish sending, close the send
    /// lane, and only then release the socket.
    pub async fn run_until<F>(self, shutdown: F) -> Result<ServeReport>
    where
        F: Future<Output = ()> + Send,
    {
        let Server {
            socket,
            table,
            limits,
        } = self;
        info!(resources = table.len(), "serving resource table");

        let stop = StopFlag::new();
        let pending = PendingTracker::new();
        let (lane, lane_task) = SendLane::spawn(Arc::clone(&socket));
        let listener = Listener::new(
            Arc::clone(&socket),
            limits,
            Processor::new(table, limits),
            lane.clone(),
            pending.clone(),
        );
        let listener_task = tokio::spawn(listener.run(stop.clone()));

        shutdown.await;
        info!("shutdown requested");
        stop.stop();

        let accepted = drain(listener_task, lane, lane_task, &pending).await;
        close_socket(socket);

        Ok(ServeReport { accepted })
    }

    pub async fn run_until_signal(self) -> Result<ServeReport> {
        self.run_until(wait_for_signal()).await
    }
}

/// Returns how many datagrams the listener accepted.
async fn drain(
    listener_task: JoinHandle<u64>,
    lane: SendLane,
    lane_task: JoinHandle<()>,
    pending: &PendingTracker,
) -> u64 {
    let accepted = listener_task.await.unwrap_or_else(|error| {
        warn!(%error, "listener task failed");
        0
    });

    let outstanding = pending.count();
    if outstanding > 0 {
        info!(outstanding, "waiting for in-flight responses");
    }
    pending.wait_drained().await;

    drop(lane);
    if let Err(error) = lane_task.await {
        warn!(%error, "send lane task failed");
    }
    accepted
}

fn close_socket(socket: Arc<UdpSocket>) {
    match Arc::try_unwrap(socket) {
        Ok(socket) => {
            drop(socket);
            info!("socket closed");
        }
        Err(socket) => warn!(
            handles = Arc::strong_count(&socket),
            "socket still referenced; it closes when the last handle drops"
        ),
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(error) => {
            warn!(%error, "failed to install SIGTERM handler");
            return wait_for_ctrl_c().await;
        }
    };
    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(error) => {
            warn!(%error, "failed to install SIGHUP handler");
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        _ = wait_for_ctrl_c() => {}
        _ = terminate.recv() => info!("received SIGTERM"),
        _ = hangup.recv() => info!("received SIGHUP"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received ctrl-c"),
        Err(error) => warn!(%error, "failed to install ctrl-c handler"),
    }
}
