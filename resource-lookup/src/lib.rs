//! Resource lookup over UDP.
//!
//! A client sends a resource name as a single datagram; the server replies
//! with the value from its JSON resource table, framed as
//! `-BEGIN-\n<value>\n-END-`, or with `-ERROR-\n<explanation>\n-END-`.
//!
//! The server is a small pipeline, one module per stage:
//!
//! - [`listener`] keeps exactly one receive outstanding and turns each
//!   completion into a [`session::Session`].
//! - [`processor`] classifies the bytes on the worker pool, looks them up in
//!   the [`table`], and frames the reply using [`protocol`].
//! - [`sender`] is the send lane: one task owns every write to the socket.
//! - [`shutdown`] holds the stop flag and the pending-reply counter that
//!   [`server::Server::run_until`] drains before closing the socket.
//!
//! [`cli`], [`config`], and [`client`] cover the command-line surface and
//! the one-shot client used by the binary and the tests.

pub mod cli;
pub mod client;
pub mod config;
pub mod listener;
pub mod processor;
pub mod protocol;
pub mod sender;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod table;
