//! Bounded worker pool for the segments of one task.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Mutex};

use super::pool::HandlePool;
use super::segment::download_one_segment;
use super::CurlOptions;
use crate::control::CancelToken;
use crate::progress::TaskSlot;
use crate::retry::{run_with_retry, RetryPolicy, SegmentError};
use crate::segmenter::Segment;
use crate::storage::StorageWriter;

/// Everything the segment workers of one task share.
pub struct SegmentRun<'a> {
    pub url: &'a str,
    pub opts: &'a CurlOptions,
    pub pool: &'a HandlePool,
    pub writer: &'a StorageWriter,
    pub cancel: &'a CancelToken,
    pub slot: &'a TaskSlot,
    pub policy: &'a RetryPolicy,
    pub max_concurrent: usize,
}

impl SegmentRun<'_> {
    /// Download `incomplete` with at most `max_concurrent` connections, each
    /// segment with its own retry loop. `on_complete(index)` runs on the calling
    /// thread after every finished segment.
    ///
    /// After the first failure no new segments are started; segments already in
    /// flight finish (and are reported) so a later resume can skip them.
    pub fn run<F>(
        &self,
        incomplete: Vec<(usize, Segment)>,
        mut on_complete: F,
    ) -> Result<(), SegmentError>
    where
        F: FnMut(usize),
    {
        let count = incomplete.len();
        if count == 0 {
            return Ok(());
        }
        let work = Mutex::new(incomplete.into_iter().collect::<VecDeque<_>>());
        let stop = AtomicBool::new(false);
        let workers = self.max_concurrent.clamp(1, count);

        std::thread::scope(|scope| {
            let (tx, rx) = mpsc::channel();
            for _ in 0..workers {
                let tx = tx.clone();
                let work = &work;
                let stop = &stop;
                scope.spawn(move || {
                    let mut easy = self.pool.checkout();
                    loop {
                        if stop.load(Ordering::Relaxed) || self.cancel.is_cancelled() {
                            break;
                        }
                        let next = work.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
                        let Some((index, segment)) = next else {
                            break;
                        };
                        let res = run_with_retry(self.policy, self.cancel, || {
                            download_one_segment(
                                &mut easy,
                                self.opts,
                                self.url,
                                segment,
                                self.writer,
                                self.cancel,
                                self.slot,
                            )
                        });
                        if tx.send((index, res)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            let mut first_error: Option<SegmentError> = None;
            for (index, res) in rx {
                match res {
                    Ok(bytes) => {
                        tracing::trace!(index, bytes, "segment complete");
                        on_complete(index);
                    }
                    Err(e) => {
                        tracing::debug!(index, url = self.url, "segment failed: {}", e);
                        stop.store(true, Ordering::Relaxed);
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }
            let leftover = !work.lock().unwrap_or_else(|e| e.into_inner()).is_empty();
            if first_error.is_none() && leftover && self.cancel.is_cancelled() {
                first_error = Some(SegmentError::Cancelled);
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })
    }
}
