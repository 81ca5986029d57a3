fn main() {
    println!("Run `cargo test -p transfer-e2e` to execute the end-to-end transfer tests.");
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use rand::{Rng, SeedableRng};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_util::sync::CancellationToken;

    use streamfs_client::{DownloadOutcome, TransferClient, UploadOutcome};
    use streamfs_rpc::{RpcError, RpcServer, TcpConnector};
    use streamfs_server::FileServer;
    use streamfs_storage::LocalStorage;
    use streamfs_transfer::TransferConfig;

    const CHUNK: usize = 1024;

    /// A server on an ephemeral localhost port with its own storage root.
    struct Harness {
        server: Arc<RpcServer<FileServer<LocalStorage>>>,
        addr: SocketAddr,
        dir: tempfile::TempDir,
        task: JoinHandle<Result<(), RpcError>>,
    }

    impl Harness {
        async fn start(config: TransferConfig) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let storage = LocalStorage::open(dir.path()).await.unwrap();
            let server = RpcServer::new(FileServer::new(storage, config));
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let run = Arc::clone(&server);
            let task = tokio::spawn(async move { run.serve(listener).await });
            Self {
                server,
                addr,
                dir,
                task,
            }
        }

        fn client(&self, config: TransferConfig) -> TransferClient<TcpConnector> {
            TransferClient::new(TcpConnector::new(self.addr.to_string()), config)
        }

        async fn stop(self) {
            self.server.shutdown();
            self.task.await.unwrap().unwrap();
        }
    }

    fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        (0..len).map(|_| rng.r#gen()).collect()
    }

    #[tokio::test]
    async fn round_trip_across_sizes_and_buffer_counts() {
        let sizes = [0, 1, CHUNK - 1, CHUNK, CHUNK + 1, 10 * CHUNK];

        for buffer_count in [1, 2, 7, 1000] {
            let config = TransferConfig::new(CHUNK, buffer_count).unwrap();
            let harness = Harness::start(config).await;
            let client = harness.client(config);
            let cancel = CancellationToken::new();

            for (i, size) in sizes.into_iter().enumerate() {
                let data = random_bytes(i as u64, size);
                let name = format!("sizes/{size}.bin");

                let uploaded = client.upload(&data[..], &name, None, &cancel).await.unwrap();
                assert_eq!(
                    uploaded,
                    UploadOutcome::Completed {
                        bytes: size as u64
                    }
                );

                let downloaded = client.download(&name, None, &cancel).await.unwrap();
                assert_eq!(
                    downloaded,
                    DownloadOutcome::Completed(data),
                    "size {size}, buffer count {buffer_count}"
                );
            }
            harness.stop().await;
        }
    }

    #[tokio::test]
    async fn cancelled_upload_leaves_no_file() {
        let config = TransferConfig::new(CHUNK, 1).unwrap();
        let harness = Harness::start(config).await;
        let client = harness.client(config);

        // Three full windows, then the source stalls.
        let (mut source_tx, source_rx) = tokio::io::duplex(8 * CHUNK);
        tokio::io::AsyncWriteExt::write_all(&mut source_tx, &random_bytes(9, 3 * CHUNK))
            .await
            .unwrap();

        // Cancel once the server has started writing the file.
        let path = harness.dir.path().join("partial/cancelled.bin");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let watched = path.clone();
        tokio::spawn(async move {
            while !watched.exists() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            trigger.cancel();
        });

        let outcome = client
            .upload(source_rx, "partial/cancelled.bin", None, &cancel)
            .await
            .unwrap();
        assert_eq!(outcome, UploadOutcome::Cancelled);

        // The server handles the abort on its own task.
        let gone = tokio::time::timeout(Duration::from_secs(5), async {
            while path.exists() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(gone.is_ok(), "partial file still present");

        let probe = harness.client(config);
        assert!(!probe.exists("partial/cancelled.bin").await.unwrap());
        drop(source_tx);
        harness.stop().await;
    }

    #[tokio::test]
    async fn missing_download_is_aborted_without_error() {
        let config = TransferConfig::new(CHUNK, 4).unwrap();
        let harness = Harness::start(config).await;
        let client = harness.client(config);

        let outcome = client
            .download("does/not/exist.bin", None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, DownloadOutcome::Aborted);
        harness.stop().await;
    }

    #[tokio::test]
    async fn concurrent_transfers_stay_independent() {
        let config = TransferConfig::new(CHUNK, 3).unwrap();
        let harness = Harness::start(config).await;
        let client = Arc::new(harness.client(config));

        let mut tasks = Vec::new();
        for i in 0..8u64 {
            let client = Arc::clone(&client);
            tasks.push(tokio::spawn(async move {
                let data = random_bytes(100 + i, 7 * CHUNK + i as usize * 13);
                let name = format!("concurrent/{i}.bin");
                let cancel = CancellationToken::new();
                client.upload(&data[..], &name, None, &cancel).await.unwrap();
                let outcome = client.download(&name, None, &cancel).await.unwrap();
                (data, outcome)
            }));
        }

        for task in tasks {
            let (data, outcome) = task.await.unwrap();
            assert_eq!(outcome, DownloadOutcome::Completed(data));
        }
        harness.stop().await;
    }

    #[tokio::test]
    async fn metadata_over_tcp() {
        let config = TransferConfig::new(CHUNK, 4).unwrap();
        let harness = Harness::start(config).await;
        let client = harness.client(config);
        let cancel = CancellationToken::new();

        client.create_directory("docs").await.unwrap();
        client
            .upload(&b"report"[..], "docs/report.txt", None, &cancel)
            .await
            .unwrap();
        client
            .copy_file("docs/report.txt", "docs/copy.txt", false)
            .await
            .unwrap();
        client
            .move_file("docs/copy.txt", "archive/copy.txt", false)
            .await
            .unwrap();

        let names: Vec<String> = client
            .list_directory("docs")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["report.txt"]);
        assert!(client.exists("archive/copy.txt").await.unwrap());

        client.delete("archive", true).await.unwrap();
        assert!(!client.exists("archive").await.unwrap());
        harness.stop().await;
    }
}
