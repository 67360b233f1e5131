//! Per-task orchestration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::control::CancelToken;
use crate::downloader::{download_single, CurlOptions, HandlePool, SegmentRun};
use crate::fetch_head::{self, HeadResult};
use crate::progress::TaskSlot;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::safe_resume::{is_strong_etag, sidecar_path, validate_for_resume, ResumeState};
use crate::segmenter::{plan_segments, SegmentBitmap};
use crate::storage::{self, StorageWriter, StorageWriterBuilder};

use super::error::TransferError;
use super::result::Completed;
use super::task::DownloadTask;

/// A sidecar may record more segments than the task now asks for (the count
/// is kept across resumes), but not more than this many times as many.
const MAX_RESUME_SEGMENT_FACTOR: usize = 64;

/// Shared state a transfer runs against.
#[derive(Clone)]
pub struct TransferContext {
    pub config: Arc<FetchConfig>,
    pub pool: Arc<HandlePool>,
    pub cancel: CancelToken,
    pub slot: Arc<TaskSlot>,
}

/// Paths and policy for one task.
struct Plan<'a> {
    task: &'a DownloadTask,
    ctx: &'a TransferContext,
    part: std::path::PathBuf,
    sidecar: std::path::PathBuf,
    policy: RetryPolicy,
    opts: CurlOptions,
}

/// Fetch `task.url` into `task.dest`. Blocking.
pub fn run_transfer(
    task: &DownloadTask,
    ctx: &TransferContext,
) -> Result<Completed, TransferError> {
    if ctx.cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }
    if let Some(parent) = task.dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| TransferError::io(parent, e))?;
    }
    if let Some(done) = existing_file(task, ctx) {
        return Ok(done);
    }

    let plan = Plan {
        task,
        ctx,
        part: storage::temp_path(&task.dest),
        sidecar: sidecar_path(&task.dest),
        policy: ctx.config.retry_policy(task.retries),
        opts: CurlOptions {
            headers: task
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            connect_timeout: Duration::from_secs(ctx.config.connect_timeout_secs),
            verify_tls: ctx.config.verify_tls,
            max_recv_speed: 0,
        },
    };

    let head = {
        let mut easy = ctx.pool.checkout();
        run_with_retry(&plan.policy, &ctx.cancel, || {
            fetch_head::probe(&mut easy, &plan.opts, &task.url, &ctx.cancel)
        })
    }
    .map_err(|e| TransferError::from_segment(e, &plan.part))
    .map_err(|e| cancelled_or(ctx, e))?;

    let size = authoritative_size(task, &head);
    ctx.slot.set_total(size);

    let split = match head.content_length {
        Some(n) => {
            task.segments > 1 && head.accept_ranges && n > 0 && n >= ctx.config.min_split_bytes
        }
        None => false,
    };
    tracing::debug!(
        id = %task.id,
        url = %task.url,
        size = ?size,
        ranges = head.accept_ranges,
        segmented = split,
        "probed"
    );

    match head.content_length {
        Some(total) if split => plan.segmented(&head, total),
        _ => plan.single(size),
    }
}

/// With overwriting off, an existing file of the right size is left alone.
fn existing_file(task: &DownloadTask, ctx: &TransferContext) -> Option<Completed> {
    if ctx.config.overwrite_existing {
        return None;
    }
    let len = storage::file_len(&task.dest)?;
    if task.expected_size.is_some_and(|n| n != len) {
        return None;
    }
    tracing::info!(id = %task.id, dest = %task.dest.display(), "exists, skipping");
    ctx.slot.set_total(Some(len));
    ctx.slot.set_done(len);
    Some(Completed {
        bytes: len,
        bytes_transferred: 0,
        size_verified: task.expected_size.is_some(),
        resumed: false,
        skipped: true,
    })
}

fn authoritative_size(task: &DownloadTask, head: &HeadResult) -> Option<u64> {
    match (head.content_length, task.expected_size) {
        (Some(probed), Some(declared)) if probed != declared => {
            tracing::warn!(
                id = %task.id,
                probed,
                declared,
                "server size differs from listing, using server size"
            );
            Some(probed)
        }
        (Some(probed), _) => Some(probed),
        (None, declared) => declared,
    }
}

/// Prefer `Cancelled` once the token is set: errors raised by aborted
/// connections are a consequence of the cancel.
fn cancelled_or(ctx: &TransferContext, e: TransferError) -> TransferError {
    if ctx.cancel.is_cancelled() {
        TransferError::Cancelled
    } else {
        e
    }
}

fn discard_partial(part: &Path, sidecar: &Path) {
    for p in [part, sidecar] {
        if let Err(e) = storage::discard(p) {
            tracing::warn!(path = %p.display(), "could not remove partial file: {}", e);
        }
    }
}

impl Plan<'_> {
    fn single(&self, size: Option<u64>) -> Result<Completed, TransferError> {
        let (task, ctx) = (self.task, self.ctx);
        // A sidecar from an earlier segmented attempt no longer describes this file.
        discard_partial(&self.part, &self.sidecar);
        ctx.slot.set_done(0);

        let mut builder =
            StorageWriterBuilder::create(&self.part).map_err(|e| TransferError::io(&self.part, e))?;
        if let Some(n) = size {
            builder
                .preallocate(n)
                .map_err(|e| TransferError::io(&self.part, e))?;
        }
        let writer = builder.build();
        let opts = self
            .opts
            .with_rate_split(ctx.config.rate_limit_bytes_per_sec, 1);

        let res = {
            let mut easy = ctx.pool.checkout();
            run_with_retry(&self.policy, &ctx.cancel, || {
                download_single(
                    &mut easy,
                    &opts,
                    &task.url,
                    &writer,
                    size,
                    &ctx.cancel,
                    &ctx.slot,
                )
            })
        };

        match res {
            Ok(received) => {
                self.finalize(writer)?;
                tracing::info!(id = %task.id, bytes = received, "downloaded");
                Ok(Completed {
                    bytes: received,
                    bytes_transferred: received,
                    size_verified: size.is_some(),
                    resumed: false,
                    skipped: false,
                })
            }
            Err(e) => {
                drop(writer);
                discard_partial(&self.part, &self.sidecar);
                Err(cancelled_or(ctx, TransferError::from_segment(e, &self.part)))
            }
        }
    }

    fn segmented(&self, head: &HeadResult, total: u64) -> Result<Completed, TransferError> {
        let (task, ctx) = (self.task, self.ctx);
        let strong_etag = head
            .etag
            .as_deref()
            .filter(|e| ctx.config.etag_validation && is_strong_etag(e));

        let previous = if ctx.config.etag_validation {
            self.load_resume(head, total)
        } else {
            None
        };
        let resumed = previous.is_some();
        if !resumed {
            discard_partial(&self.part, &self.sidecar);
        }

        let segment_count = previous.as_ref().map_or(task.segments, |s| s.segment_count);
        let segments = plan_segments(total, segment_count);
        let segment_count = segments.len();
        let mut bitmap = previous
            .as_ref()
            .map_or_else(|| SegmentBitmap::new(segment_count), ResumeState::bitmap);

        let writer = if resumed {
            StorageWriter::open_existing(&self.part).map_err(|e| TransferError::io(&self.part, e))?
        } else {
            let mut builder = StorageWriterBuilder::create(&self.part)
                .map_err(|e| TransferError::io(&self.part, e))?;
            builder
                .preallocate(total)
                .map_err(|e| TransferError::io(&self.part, e))?;
            builder.build()
        };

        let mut sidecar = match (previous, strong_etag) {
            (Some(state), _) => Some(state),
            (None, Some(etag)) => {
                let mut state = ResumeState::new(&task.url, etag, total, segment_count);
                state.last_modified = head.last_modified.clone();
                self.save_sidecar(&state);
                Some(state)
            }
            (None, None) => None,
        };

        let already = bitmap.completed_bytes(&segments);
        ctx.slot.set_done(already);
        let incomplete = bitmap.incomplete(&segments);
        if resumed {
            tracing::info!(
                id = %task.id,
                done = bitmap.completed_count(),
                segments = segment_count,
                "resuming partial download"
            );
        }

        let connections = task.segments.clamp(1, incomplete.len().max(1));
        let opts = self
            .opts
            .with_rate_split(ctx.config.rate_limit_bytes_per_sec, connections);
        let run = SegmentRun {
            url: &task.url,
            opts: &opts,
            pool: &ctx.pool,
            writer: &writer,
            cancel: &ctx.cancel,
            slot: &ctx.slot,
            policy: &self.policy,
            max_concurrent: connections,
        };
        let result = run.run(incomplete, |index| {
            bitmap.set_completed(index);
            if let Some(state) = sidecar.as_mut() {
                state.set_bitmap(&bitmap);
                self.save_sidecar(state);
            }
        });

        if let Err(e) = result {
            drop(writer);
            let err = cancelled_or(ctx, TransferError::from_segment(e, &self.part));
            let keep = match err {
                TransferError::Cancelled => resumed,
                _ => sidecar.is_some(),
            };
            if keep {
                tracing::info!(
                    id = %task.id,
                    part = %self.part.display(),
                    "keeping incomplete partial for a later resume"
                );
            } else {
                discard_partial(&self.part, &self.sidecar);
            }
            return Err(err);
        }

        let len = writer.size_on_disk().map_err(|e| TransferError::io(&self.part, e))?;
        if len != total || !bitmap.is_complete() {
            drop(writer);
            discard_partial(&self.part, &self.sidecar);
            return Err(TransferError::SizeMismatch {
                expected: total,
                actual: len,
            });
        }
        self.finalize(writer)?;
        tracing::info!(id = %task.id, bytes = total, resumed, "downloaded");
        Ok(Completed {
            bytes: total,
            bytes_transferred: total - already,
            size_verified: true,
            resumed,
            skipped: false,
        })
    }

    /// A trusted sidecar for this URL, or `None`. Untrusted partials are
    /// reported and left for the caller to discard.
    fn load_resume(&self, head: &HeadResult, total: u64) -> Option<ResumeState> {
        let task = self.task;
        if storage::file_len(&self.part) != Some(total) {
            return None;
        }
        let state = match ResumeState::load(&self.sidecar) {
            Ok(Some(state)) => state,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(id = %task.id, "unreadable resume sidecar: {}", e);
                return None;
            }
        };
        if let Err(e) = validate_for_resume(&state, &task.url, head) {
            let err = TransferError::from(e);
            tracing::warn!(id = %task.id, "restarting from scratch: {}", err);
            return None;
        }
        let limit = task.segments.max(1).saturating_mul(MAX_RESUME_SEGMENT_FACTOR);
        if !state.has_plausible_segments(total, limit) {
            tracing::warn!(
                id = %task.id,
                segments = state.segment_count,
                limit,
                "resume sidecar has an invalid segment count"
            );
            return None;
        }
        Some(state)
    }

    fn save_sidecar(&self, state: &ResumeState) {
        if let Err(e) = state.save(&self.sidecar) {
            tracing::warn!(
                id = %self.task.id,
                path = %self.sidecar.display(),
                "could not persist resume state: {}",
                e
            );
        }
    }

    fn finalize(&self, writer: StorageWriter) -> Result<(), TransferError> {
        writer
            .sync()
            .map_err(|e| TransferError::io(&self.part, e))?;
        writer
            .finalize(&self.task.dest)
            .map_err(|e| TransferError::io(&self.task.dest, e))?;
        if let Err(e) = storage::discard(&self.sidecar) {
            tracing::warn!(path = %self.sidecar.display(), "could not remove resume sidecar: {}", e);
        }
        Ok(())
    }
}
