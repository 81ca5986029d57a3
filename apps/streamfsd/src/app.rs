//! Wires storage, the file service and the RPC server together.

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use streamfs_rpc::RpcServer;
use streamfs_server::FileServer;
use streamfs_storage::LocalStorage;

use crate::config::Config;

/// Runs the daemon until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    // -- Storage --
    let storage = LocalStorage::open(&config.storage_root).await?;
    tracing::info!(root = %storage.root().display(), "storage ready");

    // -- RPC server --
    let server = RpcServer::with_cancel(FileServer::new(storage, config.transfer), cancel.clone());
    let listener = TcpListener::bind(config.listen.as_str()).await?;
    let server_run = server.clone();
    let serve = tokio::spawn(async move { server_run.serve(listener).await });

    // -- Main loop: wait for shutdown --
    tokio::select! {
        _ = cancel.cancelled() => {
            tracing::info!("shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("SIGINT received, shutting down");
        }
    }

    server.shutdown();
    serve.await??;
    Ok(())
}
