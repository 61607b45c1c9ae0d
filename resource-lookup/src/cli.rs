use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::config::{
    DEFAULT_MAX_NAME_LEN, DEFAULT_MAX_RESPONSE_LEN, DEFAULT_RECV_BUFFER_LEN, Limits, ServerConfig,
};

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve a JSON resource table over UDP.
    Server(ServerArgs),
    /// Ask a server for one resource and print the reply.
    Client(ClientArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// UDP port to listen on. Use 0 for an ephemeral port.
    #[arg(long)]
    pub port: u16,

    /// Path to a JSON object mapping resource names to values.
    #[arg(long, value_name = "PATH")]
    pub resources: PathBuf,

    /// Address to bind.
    #[arg(long, default_value_t = LOCALHOST)]
    pub host: IpAddr,

    /// Worker threads driving the runtime. Defaults to the number of CPUs.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Longest resource name accepted, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_NAME_LEN)]
    pub max_name_len: usize,

    /// Longest response sent, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_RESPONSE_LEN)]
    pub max_response_len: usize,

    /// Size of each receive buffer, in bytes.
    #[arg(long, default_value_t = DEFAULT_RECV_BUFFER_LEN)]
    pub recv_buffer_len: usize,
}

impl ServerArgs {
    pub fn server_config(&self) -> Result<ServerConfig> {
        Ok(ServerConfig {
            bind: SocketAddr::new(self.host, self.port),
            limits: Limits::new(
                self.max_name_len,
                self.max_response_len,
                self.recv_buffer_len,
            )?,
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// UDP port the server listens on.
    #[arg(long)]
    pub port: u16,

    /// Name of the resource to look up.
    #[arg(long)]
    pub resource: String,

    /// Address of the server.
    #[arg(long, default_value_t = LOCALHOST)]
    pub host: IpAddr,

    /// Give up after this many milliseconds. Waits forever when omitted.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Longest reply accepted, in bytes. Match the server's setting.
    #[arg(long, default_value_t = DEFAULT_MAX_RESPONSE_LEN)]
    pub max_response_len: usize,
}
