use std::time::{Duration, Instant};

use streamfs_protocol::TransferMark;

/// State of one client transfer call. Lives exactly as long as the call.
#[derive(Debug, Clone)]
pub struct TransferSession {
    mark: TransferMark,
    file_path: String,
    chunk_size: usize,
    started_at: Instant,
}

impl TransferSession {
    /// Starts a session with a freshly generated mark.
    pub fn start(file_path: impl Into<String>, chunk_size: usize) -> Self {
        Self::with_mark(TransferMark::generate(), file_path, chunk_size)
    }

    pub fn with_mark(mark: TransferMark, file_path: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            mark,
            file_path: file_path.into(),
            chunk_size,
            started_at: Instant::now(),
        }
    }

    pub fn mark(&self) -> &TransferMark {
        &self.mark
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
