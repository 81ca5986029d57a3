//! streamfs server daemon entry point.

mod app;
mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Serves a directory over the streamfs protocol", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address from the configuration
    #[arg(short, long)]
    listen: Option<String>,
}

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting streamfsd");

    let path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let mut config = config::Config::load(&path)?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    tracing::info!(
        path = %path.display(),
        listen = %config.listen,
        root = %config.storage_root.display(),
        chunk_size = config.transfer.chunk_size,
        chunk_buffer_count = config.transfer.chunk_buffer_count,
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("streamfsd shut down cleanly");
    Ok(())
}
