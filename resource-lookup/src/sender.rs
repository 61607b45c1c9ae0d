//! The send lane: the only writer on the shared socket.
//!
//! Processing tasks finish in any order and on any worker thread. Instead of
//! letting each of them call `send_to`, they push their [`Reply`] into an
//! unbounded channel and a single task transmits replies one at a time, in
//! the order they were queued.

use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::session::Reply;

#[derive(Clone, Debug)]
pub struct SendLane {
    tx: mpsc::UnboundedSender<Reply>,
}

impl SendLane {
    /// Starts the lane task. It runs until every `SendLane` clone is dropped
    /// and the queue is empty.
    pub fn spawn(socket: Arc<UdpSocket>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(drive(socket, rx));
        (Self { tx }, task)
    }

    /// Queues a reply without blocking. If the lane has already shut down
    /// the reply is dropped.
    pub fn enqueue(&self, reply: Reply) {
        if let Err(mpsc::error::SendError(reply)) = self.tx.send(reply) {
            warn!(peer = ?reply.peer, "send lane closed; dropping response");
        }
    }
}

async fn drive(socket: Arc<UdpSocket>, mut rx: mpsc::UnboundedReceiver<Reply>) {
    while let Some(reply) = rx.recv().await {
        transmit(&socket, reply).await;
    }
    debug!("send lane drained");
}

/// Sends one reply. The reply is dropped afterwards whatever the outcome,
/// which completes its session.
async fn transmit(socket: &UdpSocket, reply: Reply) {
    let Some(peer) = reply.peer else {
        warn!(response = %reply.text, "response has no destination; dropping");
        return;
    };

    match socket.send_to(reply.text.as_bytes(), peer).await {
        Ok(sent) => debug!(%peer, bytes = sent, "response sent"),
        Err(error) => warn!(%peer, %error, "failed to send response"),
    }
}
