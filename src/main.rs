//! Stepwise CLI entry point

use clap::Parser;
use stepwise::cli::{Cli, Commands};
use stepwise::core::error::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_env("STEPWISE_LOG"))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Instrument(args) => stepwise::cli::instrument::run(args),
        Commands::Extract(args) => stepwise::cli::extract::run(args),
        Commands::Run(args) => stepwise::cli::run::run(args).await,
        Commands::Regions(args) => stepwise::cli::regions::run(args),
    }
}
