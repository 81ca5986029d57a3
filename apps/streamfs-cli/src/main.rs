//! Command line client for a streamfs server.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use streamfs_client::{DownloadOutcome, TransferClient, UploadOutcome};
use streamfs_protocol::ProgressEvent;
use streamfs_rpc::TcpConnector;
use streamfs_transfer::ProgressCallback;

use crate::config::{FileConfig, Overrides, Settings};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML file with `server` and a `[transfer]` table
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Server address, e.g. `host:7420`
    #[arg(short, long, global = true)]
    server: Option<String>,

    /// Bytes per frame
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Frames buffered before each flush
    #[arg(long, global = true)]
    buffer_count: Option<usize>,

    /// Print progress while transferring
    #[arg(short, long, global = true)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file
    Upload {
        /// Local file to send
        local: PathBuf,
        /// Destination path on the server (defaults to the local file name)
        remote: Option<String>,
    },
    /// Download a file from the server
    Download {
        /// Path on the server
        remote: String,
        /// Local destination (defaults to the remote file name)
        local: Option<PathBuf>,
    },
    /// Check whether a path exists
    Exists { path: String },
    /// Create a directory and its parents
    Mkdir { path: String },
    /// Delete a file or directory
    Rm {
        path: String,
        /// Delete directory contents too
        #[arg(short, long)]
        recursive: bool,
    },
    /// Move a file
    Mv {
        from: String,
        to: String,
        /// Replace an existing destination
        #[arg(short, long)]
        overwrite: bool,
    },
    /// Copy a file
    Cp {
        from: String,
        to: String,
        /// Replace an existing destination
        #[arg(short, long)]
        overwrite: bool,
    },
    /// List a directory
    Ls {
        #[arg(default_value = "")]
        path: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(
        file,
        Overrides {
            server: cli.server.clone(),
            chunk_size: cli.chunk_size,
            chunk_buffer_count: cli.buffer_count,
        },
    )?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli, settings))
}

async fn run(cli: Cli, settings: Settings) -> anyhow::Result<()> {
    debug!(
        server = %settings.server,
        chunk_size = settings.transfer.chunk_size,
        chunk_buffer_count = settings.transfer.chunk_buffer_count,
        "resolved settings"
    );
    let client = TransferClient::new(TcpConnector::new(settings.server), settings.transfer);

    // Ctrl-C cancels the running transfer.
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            trigger.cancel();
        }
    });

    let progress = cli.progress.then(progress_printer);

    match cli.command {
        Commands::Upload { local, remote } => {
            let remote = match remote {
                Some(remote) => remote,
                None => file_name_of(&local)?,
            };
            match client.upload_file(&local, &remote, progress, &cancel).await? {
                UploadOutcome::Completed { bytes } => println!("uploaded {remote} ({bytes} bytes)"),
                UploadOutcome::Cancelled => bail!("upload cancelled"),
            }
        }
        Commands::Download { remote, local } => {
            let local = match local {
                Some(local) => local,
                None => PathBuf::from(file_name_of(&PathBuf::from(&remote))?),
            };
            match client
                .download_to_file(&remote, &local, progress, &cancel)
                .await?
            {
                DownloadOutcome::Completed(bytes) => {
                    println!("downloaded {remote} ({} bytes)", bytes.len())
                }
                DownloadOutcome::Aborted => bail!("{remote}: not found or aborted by server"),
                DownloadOutcome::Cancelled => bail!("download cancelled"),
            }
        }
        Commands::Exists { path } => {
            let exists = client.exists(&path).await?;
            println!("{exists}");
            if !exists {
                std::process::exit(1);
            }
        }
        Commands::Mkdir { path } => client.create_directory(&path).await?,
        Commands::Rm { path, recursive } => client.delete(&path, recursive).await?,
        Commands::Mv {
            from,
            to,
            overwrite,
        } => client.move_file(&from, &to, overwrite).await?,
        Commands::Cp {
            from,
            to,
            overwrite,
        } => client.copy_file(&from, &to, overwrite).await?,
        Commands::Ls { path } => {
            for entry in client.list_directory(&path).await? {
                let kind = if entry.is_dir { "d" } else { "-" };
                let modified = entry
                    .modified
                    .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!("{kind} {:>12} {modified:>16} {}", entry.size, entry.name);
            }
        }
    }
    Ok(())
}

fn file_name_of(path: &std::path::Path) -> anyhow::Result<String> {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => Ok(name.to_owned()),
        None => bail!("cannot derive a file name from {}", path.display()),
    }
}

fn progress_printer() -> ProgressCallback {
    Arc::new(|event: ProgressEvent| {
        if event.is_completed {
            eprintln!("{}: {}", event.file_name, event.message);
        } else {
            eprintln!(
                "{}: {} ({} bytes)",
                event.file_name, event.message, event.bytes_transferred
            );
        }
    })
}
