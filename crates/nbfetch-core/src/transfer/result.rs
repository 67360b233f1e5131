use std::sync::Arc;
use std::time::Duration;

use super::error::TransferError;
use super::task::DownloadTask;

/// A task that ended well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completed {
    /// Final file size.
    pub bytes: u64,
    /// Bytes fetched over the network in this run (less than `bytes` after a resume).
    pub bytes_transferred: u64,
    /// Whether the file length was checked against a known size.
    pub size_verified: bool,
    pub resumed: bool,
    /// Existing file kept because overwriting was disabled.
    pub skipped: bool,
}

/// Exactly one per submitted task.
#[derive(Debug)]
pub struct TransferResult {
    pub task: Arc<DownloadTask>,
    pub outcome: Result<Completed, TransferError>,
    pub duration: Duration,
}

impl TransferResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&TransferError> {
        self.outcome.as_ref().err()
    }

    /// Result for a task that was never started.
    pub fn cancelled(task: Arc<DownloadTask>) -> Self {
        Self {
            task,
            outcome: Err(TransferError::Cancelled),
            duration: Duration::ZERO,
        }
    }
}
