use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use m3u_export::{config::Config, pipeline};

#[derive(Parser)]
#[command(name = "m3u-export")]
#[command(version)]
#[command(
    about = "Fetches M3U playlists, applies per-model filters and transformations, and exports filtered playlists with matching XMLTV guides"
)]
struct Cli {
    /// Configuration file path (TOML, or JSON by extension)
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("m3u_export={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting m3u-export v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load_from_file(&cli.config)?;
    info!(
        "Configuration loaded from: {} ({} sources)",
        cli.config,
        config.sources.len()
    );

    let summary = pipeline::run(config).await;
    info!(
        "Run complete: {} sources succeeded, {} failed",
        summary.succeeded, summary.failed
    );

    if summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
