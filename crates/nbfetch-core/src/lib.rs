//! nbfetch core: a concurrent, resumable, segmented download engine plus the
//! listing collector that feeds it.
//!
//! The usual flow is [`listing::Collector`] → `Vec<DownloadTask>` →
//! [`scheduler::Scheduler::submit`] → one [`transfer::TransferResult`] per task.

pub mod config;
pub mod logging;

pub mod control;
pub mod downloader;
pub mod fetch_head;
pub mod listing;
pub mod progress;
pub mod retry;
pub mod safe_resume;
pub mod scheduler;
pub mod segmenter;
pub mod size;
pub mod storage;
pub mod transfer;
pub mod url_model;

pub use config::FetchConfig;
pub use control::CancelToken;
pub use scheduler::Scheduler;
pub use transfer::{Completed, DownloadTask, FailureKind, TaskId, TransferError, TransferResult};
