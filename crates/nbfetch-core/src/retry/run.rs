//! Retry loop: run a closure until success or policy says stop.

use super::classify;
use super::error::SegmentError;
use super::policy::{RetryDecision, RetryPolicy};
use crate::control::CancelToken;

/// Runs `f` until it succeeds or the retry policy says to stop.
///
/// On retryable failure, waits for the backoff on `cancel`; a cancel during the
/// wait ends the loop with `SegmentError::Cancelled`.
pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut f: F,
) -> Result<T, SegmentError>
where
    F: FnMut() -> Result<T, SegmentError>,
{
    let mut attempt = 1u32;
    loop {
        if cancel.is_cancelled() {
            return Err(SegmentError::Cancelled);
        }
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(attempt, ?kind, delay_ms = d.as_millis() as u64, "retrying after: {}", e);
                        if !cancel.sleep(d) {
                            return Err(SegmentError::Cancelled);
                        }
                        attempt += 1;
                    }
                }
            }
        }
    }
}
