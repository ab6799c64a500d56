use clap::Parser;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use radio_logger::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Diagnostics go to stderr; stdout is reserved for the title echo.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let cli = Cli::parse();

    info!("Starting radio-logger v{}", env!("CARGO_PKG_VERSION"));

    cli.run().await
}
