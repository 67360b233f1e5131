//! Run tasks concurrently with a bounded worker count.
//!
//! Keeps up to `max_workers` transfers in flight; when one finishes, the next
//! queued task starts until the queue is empty or the run is cancelled.

use anyhow::Result;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use crate::config::FetchConfig;
use crate::control::CancelToken;
use crate::downloader::HandlePool;
use crate::progress::{ProgressBoard, ProgressReporter, ReportSink, TaskSlot};
use crate::size::format_binary;
use crate::transfer::{run_transfer, DownloadTask, TransferContext, TransferError, TransferResult};

pub(super) async fn run_tasks_parallel(
    tasks: Vec<Arc<DownloadTask>>,
    config: Arc<FetchConfig>,
    sink: Arc<dyn ReportSink>,
    cancel: CancelToken,
) -> Result<Vec<TransferResult>> {
    let total = tasks.len();
    let max_workers = config.max_workers.max(1);
    let board = Arc::new(ProgressBoard::new(tasks.iter().map(|t| t.id.clone())));
    let reporter =
        ProgressReporter::spawn(Arc::clone(&board), Arc::clone(&sink), config.progress_interval());
    let pool = Arc::new(HandlePool::new(config.handle_pool_capacity()));

    let mut queue: VecDeque<(usize, Arc<DownloadTask>)> = tasks.into_iter().enumerate().collect();
    let mut results = Vec::with_capacity(total);
    let mut join_set = tokio::task::JoinSet::new();

    loop {
        while join_set.len() < max_workers && !cancel.is_cancelled() {
            let Some((index, task)) = queue.pop_front() else {
                break;
            };
            let ctx = TransferContext {
                config: Arc::clone(&config),
                pool: Arc::clone(&pool),
                cancel: cancel.clone(),
                slot: board
                    .slot(index)
                    .unwrap_or_else(|| Arc::new(TaskSlot::default())),
            };
            board.task_started();
            tracing::debug!(id = %task.id, url = %task.url, "dispatching");
            join_set.spawn(async move {
                let started = Instant::now();
                let blocking_task = Arc::clone(&task);
                let outcome =
                    match tokio::task::spawn_blocking(move || run_transfer(&blocking_task, &ctx))
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(e) => Err(TransferError::io(
                            &task.dest,
                            std::io::Error::new(
                                std::io::ErrorKind::Other,
                                format!("transfer worker failed: {}", e),
                            ),
                        )),
                    };
                TransferResult {
                    task,
                    outcome,
                    duration: started.elapsed(),
                }
            });
        }

        if join_set.is_empty() {
            break;
        }

        let Some(res) = join_set.join_next().await else {
            break;
        };
        let result = res.map_err(|e| anyhow::anyhow!("transfer task join: {}", e))?;
        board.task_finished(result.is_success());
        report(sink.as_ref(), &result);
        results.push(result);
    }

    for (_, task) in queue {
        board.task_skipped();
        let result = TransferResult::cancelled(task);
        report(sink.as_ref(), &result);
        results.push(result);
    }

    // Idle handles close their cached connections here.
    drop(pool);
    reporter.finish(&results).await;
    Ok(results)
}

fn report(sink: &dyn ReportSink, result: &TransferResult) {
    let task = &result.task;
    match &result.outcome {
        Ok(done) => {
            let mut line = format!(
                "ok {} -> {} ({})",
                task.id,
                task.dest.display(),
                format_binary(done.bytes)
            );
            if done.skipped {
                line.push_str(", existing");
            } else if done.resumed {
                line.push_str(", resumed");
            }
            if !done.size_verified {
                line.push_str(", size unverified");
            }
            tracing::info!(id = %task.id, elapsed_ms = result.duration.as_millis() as u64, "{}", line);
            sink.emit(&line);
        }
        Err(e) => {
            let line = format!("failed {} {}: {}", task.id, task.url, e);
            tracing::warn!(id = %task.id, kind = ?e.kind(), "{}", line);
            sink.emit(&line);
        }
    }
}
