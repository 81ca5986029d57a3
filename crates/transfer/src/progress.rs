use std::sync::Arc;

use streamfs_protocol::ProgressEvent;

/// Callback invoked with transfer progress.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Emits [`ProgressEvent`]s for a single file.
///
/// Reporting never influences the transfer; without a callback every method
/// is a no-op.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    file_name: String,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressCallback>, file_name: impl Into<String>) -> Self {
        Self {
            callback,
            file_name: file_name.into(),
        }
    }

    /// A reporter that drops every event.
    pub fn silent(file_name: impl Into<String>) -> Self {
        Self::new(None, file_name)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Reports cumulative bytes moved while the transfer is still running.
    pub fn transferred(&self, bytes: u64) {
        self.emit(false, format!("{bytes} bytes transferred"), None, bytes);
    }

    /// Reports a successful end of transfer. `result` carries the byte count.
    pub fn completed(&self, bytes: u64) {
        self.emit(
            true,
            "transfer completed".into(),
            Some(bytes.to_string()),
            bytes,
        );
    }

    /// Reports a transfer that ended without usable output.
    pub fn incomplete(&self, reason: &str, bytes: u64) {
        self.emit(false, reason.to_string(), None, bytes);
    }

    fn emit(&self, is_completed: bool, message: String, result: Option<String>, bytes: u64) {
        let Some(cb) = &self.callback else {
            return;
        };
        cb(ProgressEvent {
            is_completed,
            message,
            file_name: self.file_name.clone(),
            result,
            bytes_transferred: bytes,
        });
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("file_name", &self.file_name)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording() -> (ProgressCallback, Arc<Mutex<Vec<ProgressEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let cb: ProgressCallback = Arc::new(move |evt| sink.lock().unwrap().push(evt));
        (cb, events)
    }

    #[test]
    fn transferred_is_not_completed() {
        let (cb, events) = recording();
        let reporter = ProgressReporter::new(Some(cb), "a.bin");
        reporter.transferred(512);

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(!events[0].is_completed);
        assert_eq!(events[0].bytes_transferred, 512);
        assert_eq!(events[0].file_name, "a.bin");
        assert!(events[0].result.is_none());
    }

    #[test]
    fn completed_carries_byte_count_result() {
        let (cb, events) = recording();
        let reporter = ProgressReporter::new(Some(cb), "a.bin");
        reporter.completed(2048);

        let events = events.lock().unwrap();
        assert!(events[0].is_completed);
        assert_eq!(events[0].result.as_deref(), Some("2048"));
    }

    #[test]
    fn incomplete_keeps_reason() {
        let (cb, events) = recording();
        let reporter = ProgressReporter::new(Some(cb), "a.bin");
        reporter.incomplete("cancelled", 10);

        let events = events.lock().unwrap();
        assert!(!events[0].is_completed);
        assert_eq!(events[0].message, "cancelled");
    }

    #[test]
    fn silent_reporter_does_not_panic() {
        let reporter = ProgressReporter::silent("a.bin");
        reporter.transferred(1);
        reporter.completed(1);
        reporter.incomplete("x", 0);
    }
}
