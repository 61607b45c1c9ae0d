use anyhow::{Context, Result};
use clap::Parser;
use tokio::runtime::{Builder, Runtime};
use tracing::{info, warn};

use resource_lookup::{
    cli::{Cli, Command, ServerArgs},
    client,
    server::Server,
    table::ResourceTable,
};

fn init_tracing() {
    use std::io::IsTerminal;
    use tracing_subscriber::{EnvFilter, fmt};

    // Logs go to stderr; the client writes the reply to stdout untouched.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Server(args) => run_server(args),
        Command::Client(args) => {
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to start runtime")?;
            runtime.block_on(client::run(args))
        }
    }
}

fn run_server(args: ServerArgs) -> Result<()> {
    let config = args.server_config()?;
    let table = ResourceTable::load(&args.resources)
        .with_context(|| format!("failed to load {}", args.resources.display()))?;
    info!(resources = table.len(), path = %args.resources.display(), "loaded resource table");

    let runtime = server_runtime(args.workers)?;
    runtime.block_on(async {
        let server = Server::bind(&config, table).await?;
        let addr = server.local_addr()?;
        info!("server listening on {}", addr);
        let report = match server.run_until_signal().await {
            Ok(report) => report,
            Err(err) => {
                warn!("server exited with error: {err:?}");
                return Err(err);
            }
        };
        info!(accepted = report.accepted, "server stopped");
        Ok(())
    })
}

fn server_runtime(workers: Option<usize>) -> Result<Runtime> {
    let mut builder = Builder::new_multi_thread();
    if let Some(workers) = workers {
        anyhow::ensure!(workers > 0, "--workers must be at least 1");
        builder.worker_threads(workers);
    }
    builder.enable_all().build().context("failed to start runtime")
}
