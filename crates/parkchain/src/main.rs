//! Parkchain CLI binary.

use anyhow::Result;
use parkchain::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the parkchain CLI.
///
/// Each invocation handles one request, so a current_thread runtime is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Example: RUST_LOG=parkchain=debug parkchain need-to-go 3
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("parkchain=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting parkchain CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("Parkchain CLI completed successfully");
    Ok(())
}
