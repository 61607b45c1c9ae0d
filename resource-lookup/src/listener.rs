use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::select;
use tracing::{debug, info, warn};

use crate::config::Limits;
use crate::processor::Processor;
use crate::sender::SendLane;
use crate::session::Session;
use crate::shutdown::{PendingTracker, StopFlag};

/// Pause after a failed receive so a socket stuck in an error state does not
/// spin the loop.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Owns the receive side of the socket.
pub struct Listener {
    socket: Arc<UdpSocket>,
    limits: Limits,
    processor: Processor,
    lane: SendLane,
    pending: PendingTracker,
}

impl Listener {
    pub fn new(
        socket: Arc<UdpSocket>,
        limits: Limits,
        processor: Processor,
        lane: SendLane,
        pending: PendingTracker,
    ) -> Self {
        Self {
            socket,
            limits,
            processor,
            lane,
            pending,
        }
    }

    /// Keeps exactly one receive outstanding until `stop` is set.
    ///
    /// Every completed receive, including a failed one, becomes a session
    /// that is processed off this loop. A receive that is still pending when
    /// the flag flips is abandoned; `recv_from` is cancel-safe, so nothing
    /// was taken off the socket.
    ///
    /// Returns the number of datagrams accepted.
    pub async fn run(self, stop: StopFlag) -> u64 {
        let mut accepted: u64 = 0;

        while !stop.is_stopped() {
            let mut buf = vec![0u8; self.limits.recv_buffer_len];
            select! {
                biased;
                _ = stop.stopped() => break,
                received = self.socket.recv_from(&mut buf) => {
                    accepted += 1;
                    let failed = received.is_err();
                    self.dispatch(received, buf);
                    if failed {
                        back_off(&stop, RECV_ERROR_BACKOFF).await;
                    }
                }
            }
        }

        info!(accepted, "listener stopped");
        accepted
    }

    fn dispatch(&self, received: std::io::Result<(usize, std::net::SocketAddr)>, mut buf: Vec<u8>) {
        let pending = self.pending.track();
        let session = match received {
            Ok((len, peer)) => {
                debug!(%peer, bytes = len, "datagram received");
                buf.truncate(len);
                Session::new(Some(peer), Ok(buf), pending)
            }
            Err(error) => {
                warn!(%error, "receive failed");
                Session::new(None, Err(error), pending)
            }
        };
        self.processor.spawn(session, self.lane.clone());
    }
}

/// Sleeps for `delay`, or less if `stop` is set meanwhile.
async fn back_off(stop: &StopFlag, delay: Duration) {
    select! {
        _ = stop.stopped() => {}
        _ = tokio::time::sleep(delay) => {}
    }
}
