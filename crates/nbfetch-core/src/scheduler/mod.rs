//! Batch scheduler: runs submitted tasks on a bounded pool and reports.
//!
//! At most `max_workers` tasks transfer at once. Each task may open up to
//! `segments_per_task` connections, so the connection count of a batch can
//! reach `max_workers * segments_per_task`.

mod parallel;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::config::FetchConfig;
use crate::control::CancelToken;
use crate::progress::{ReportSink, TracingSink};
use crate::transfer::{DownloadTask, TransferResult};

pub struct Scheduler {
    config: Arc<FetchConfig>,
    sink: Arc<dyn ReportSink>,
    cancel: CancelToken,
}

impl Scheduler {
    pub fn new(config: FetchConfig, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            config: Arc::new(config),
            sink,
            cancel: CancelToken::new(),
        }
    }

    /// Scheduler that reports through `tracing`.
    pub fn with_tracing(config: FetchConfig) -> Self {
        Self::new(config, Arc::new(TracingSink))
    }

    /// Token that cancels every task of this scheduler, running or queued.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run all `tasks` and return one result per task, in completion order.
    ///
    /// Task failures are reported in the results. `Err` is returned only for
    /// problems that prevent the batch from running at all: invalid config, an
    /// uncreatable download directory, or duplicate task ids.
    pub async fn submit(&self, tasks: Vec<DownloadTask>) -> Result<Vec<TransferResult>> {
        self.config.validate()?;
        let dir = &self.config.download_dir;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create download directory {}", dir.display()))?;

        let mut seen = HashSet::with_capacity(tasks.len());
        for t in &tasks {
            if !seen.insert(&t.id) {
                bail!("duplicate task id {}", t.id);
            }
        }

        let tasks: Vec<Arc<DownloadTask>> = tasks.into_iter().map(Arc::new).collect();
        tracing::info!(
            tasks = tasks.len(),
            workers = self.config.max_workers,
            "starting batch"
        );
        parallel::run_tasks_parallel(
            tasks,
            Arc::clone(&self.config),
            Arc::clone(&self.sink),
            self.cancel.clone(),
        )
        .await
    }
}
