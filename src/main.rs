//! OKR cascade preview
//!
//! Loads an OKR snapshot and renders cascade, progress, filter, task, program
//! and ritual reports from it. The snapshot is never modified.

use clap::Parser;
use okr_cascade::cli::{self, Cli};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match cli.log_level.as_deref() {
        Some(level) => EnvFilter::new(level.to_ascii_lowercase()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    cli::okr::execute(cli.command, cli.snapshot).await
}
