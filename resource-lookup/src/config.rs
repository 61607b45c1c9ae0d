use std::net::SocketAddr;

use anyhow::{Result, ensure};

/// Largest resource name the protocol accepts.
pub const DEFAULT_MAX_NAME_LEN: usize = 64;
/// Largest framed response the server will put on the wire.
pub const DEFAULT_MAX_RESPONSE_LEN: usize = 1024;
/// Size of the buffer each receive is issued with.
pub const DEFAULT_RECV_BUFFER_LEN: usize = 1024;

/// Size bounds shared by the listener, the processor, and the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_name_len: usize,
    pub max_response_len: usize,
    pub recv_buffer_len: usize,
}

impl Limits {
    pub fn new(max_name_len: usize, max_response_len: usize, recv_buffer_len: usize) -> Result<Self> {
        ensure!(max_name_len > 0, "max name length must be positive");
        ensure!(
            recv_buffer_len > max_name_len,
            "receive buffer ({recv_buffer_len} bytes) must be larger than the max name length \
             ({max_name_len} bytes) to detect oversized names"
        );
        ensure!(
            max_response_len > 0,
            "max response length must be positive"
        );
        Ok(Self {
            max_name_len,
            max_response_len,
            recv_buffer_len,
        })
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_name_len: DEFAULT_MAX_NAME_LEN,
            max_response_len: DEFAULT_MAX_RESPONSE_LEN,
            recv_buffer_len: DEFAULT_RECV_BUFFER_LEN,
        }
    }
}

/// Everything the server needs besides its resource table.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind. Port 0 picks an ephemeral port.
    pub bind: SocketAddr,
    pub limits: Limits,
}

impl ServerConfig {
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            limits: Limits::default(),
        }
    }
}
