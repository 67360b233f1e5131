//! One file from URL to verified destination.
//!
//! `run_transfer` is blocking and meant for a `spawn_blocking` thread. It
//! probes the URL, picks segmented or single-stream mode, resumes a trusted
//! partial if one exists, verifies the byte count and renames `.part` into place.

mod error;
mod result;
mod run;
mod task;

pub use error::{FailureKind, TransferError};
pub use result::{Completed, TransferResult};
pub use run::{run_transfer, TransferContext};
pub use task::{DownloadTask, TaskId};
