//! CLI entry point for the photo mosaic generator

use clap::Parser;
use tilemosaic::io::cli::{Cli, MosaicRunner};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> tilemosaic::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tilemosaic=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    MosaicRunner::new(cli).process()?;
    Ok(())
}
