//! Sampler + renderer pair.
//!
//! The sampler copies the board every tick and `try_send`s into a one-slot
//! channel; when the renderer is still busy the fresh snapshot is dropped, so a
//! slow sink never backs up the transfers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::board::{ProgressBoard, ProgressSnapshot};
use super::sink::ReportSink;
use crate::size::format_binary;
use crate::transfer::TransferResult;

/// Format one progress line.
pub fn render_line(s: &ProgressSnapshot) -> String {
    format!(
        "files {}/{} | {}/{} | {}/s | active {}",
        s.finished_tasks(),
        s.total_tasks,
        format_binary(s.bytes_done),
        format_binary(s.bytes_total),
        format_binary(s.bytes_per_sec() as u64),
        s.active
    )
}

/// Final tally line.
pub fn summary_line(results: &[TransferResult]) -> String {
    let success = results.iter().filter(|r| r.is_success()).count();
    format!(
        "{}/{} files downloaded successfully",
        success,
        results.len()
    )
}

pub struct ProgressReporter {
    sink: Arc<dyn ReportSink>,
    stop_tx: Option<oneshot::Sender<()>>,
    sampler: JoinHandle<()>,
    renderer: JoinHandle<()>,
}

impl ProgressReporter {
    /// Start sampling `board` every `interval`. Must be called inside a tokio runtime.
    pub fn spawn(
        board: Arc<ProgressBoard>,
        sink: Arc<dyn ReportSink>,
        interval: Duration,
    ) -> Self {
        let (snap_tx, mut snap_rx) = mpsc::channel::<ProgressSnapshot>(1);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let interval = interval.max(Duration::from_millis(10));

        let sampler = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        match snap_tx.try_send(board.snapshot()) {
                            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => {}
                            Err(mpsc::error::TrySendError::Closed(_)) => break,
                        }
                    }
                }
            }
        });

        let render_sink = Arc::clone(&sink);
        let renderer = tokio::spawn(async move {
            while let Some(snapshot) = snap_rx.recv().await {
                render_sink.emit(&render_line(&snapshot));
            }
        });

        Self {
            sink,
            stop_tx: Some(stop_tx),
            sampler,
            renderer,
        }
    }

    /// Stop both tasks and emit the summary line.
    pub async fn finish(mut self, results: &[TransferResult]) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.sampler).await {
            tracing::warn!("progress sampler ended abnormally: {}", e);
        }
        if let Err(e) = (&mut self.renderer).await {
            tracing::warn!("progress renderer ended abnormally: {}", e);
        }
        self.sink.emit(&summary_line(results));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::MemorySink;
    use crate::transfer::{DownloadTask, TaskId};

    #[test]
    fn render_line_format() {
        let s = ProgressSnapshot {
            tasks: Vec::new(),
            bytes_done: 2048,
            bytes_total: 4096,
            active: 2,
            completed: 1,
            failed: 1,
            total_tasks: 5,
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(
            render_line(&s),
            "files 2/5 | 2.00KiB/4.00KiB | 2.00KiB/s | active 2"
        );
    }

    #[tokio::test]
    async fn reporter_emits_progress_then_summary() {
        let board = Arc::new(ProgressBoard::new([TaskId::new("a")]));
        let sink = Arc::new(MemorySink::new());
        let reporter =
            ProgressReporter::spawn(Arc::clone(&board), sink.clone(), Duration::from_millis(10));
        board.slot(0).unwrap().add(10);
        tokio::time::sleep(Duration::from_millis(60)).await;

        let task = Arc::new(DownloadTask::new(
            TaskId::new("a"),
            "http://localhost/a",
            "a.bin",
        ));
        let results = vec![crate::transfer::TransferResult::cancelled(task)];
        reporter.finish(&results).await;

        let lines = sink.lines();
        assert!(lines.len() >= 2, "{:?}", lines);
        assert!(lines[0].starts_with("files 0/1"));
        assert_eq!(
            lines.last().map(String::as_str),
            Some("0/1 files downloaded successfully")
        );
    }
}
