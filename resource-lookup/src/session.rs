//! Per-request state, handed from stage to stage by value.
//!
//! A [`Session`] is built by the listener when a receive completes and is
//! consumed by the processor, which turns it into a [`Reply`]. The reply is
//! consumed by the send lane. Each value has exactly one owner, so a request
//! cannot be processed twice or sent after it was released.

use std::borrow::Cow;
use std::io;
use std::net::SocketAddr;

use crate::shutdown::PendingGuard;

#[derive(Debug)]
pub struct Session {
    /// Source of the datagram. `None` when the receive itself failed and
    /// the transport did not report a peer.
    pub peer: Option<SocketAddr>,
    received: io::Result<Vec<u8>>,
    pending: PendingGuard,
}

impl Session {
    pub fn new(peer: Option<SocketAddr>, received: io::Result<Vec<u8>>, pending: PendingGuard) -> Self {
        Self {
            peer,
            received,
            pending,
        }
    }

    /// Finishes processing: `build` consumes what was received and the
    /// pending slot moves into the reply.
    pub fn respond<F>(self, build: F) -> Reply
    where
        F: FnOnce(io::Result<Vec<u8>>) -> Cow<'static, str>,
    {
        let text = build(self.received);
        Reply {
            peer: self.peer,
            text,
            _pending: self.pending,
        }
    }
}

/// A formatted response waiting for the send lane. Dropping it marks the
/// session complete.
#[derive(Debug)]
pub struct Reply {
    pub peer: Option<SocketAddr>,
    pub text: Cow<'static, str>,
    _pending: PendingGuard,
}
