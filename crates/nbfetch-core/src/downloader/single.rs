//! Full-body GET for servers (or files) where segmenting does not apply.

use std::cell::Cell;

use curl::easy::Easy;

use super::CurlOptions;
use crate::control::CancelToken;
use crate::progress::TaskSlot;
use crate::retry::SegmentError;
use crate::storage::StorageWriter;

/// Streams the whole body into `writer` from offset 0 and truncates the file
/// to what was received. When `expected` is known, a different body length is
/// a `PartialTransfer` so the caller's retry loop can try again.
pub fn download_single(
    easy: &mut Easy,
    opts: &CurlOptions,
    url: &str,
    writer: &StorageWriter,
    expected: Option<u64>,
    cancel: &CancelToken,
    slot: &TaskSlot,
) -> Result<u64, SegmentError> {
    opts.apply(easy, url).map_err(SegmentError::Curl)?;

    let mut received = 0u64;
    let rejected = Cell::new(false);
    let mut storage_error: Option<std::io::Error> = None;

    let result = {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                if rejected.get() {
                    return Ok(0);
                }
                match writer.write_at(received, data) {
                    Ok(()) => {
                        let n = data.len() as u64;
                        received += n;
                        slot.add(n);
                        Ok(data.len())
                    }
                    Err(e) => {
                        storage_error = Some(e);
                        Ok(0)
                    }
                }
            })
            .map_err(SegmentError::Curl)?;
        transfer
            .header_function(|h| {
                // Error bodies must not land in the file.
                if let Ok(s) = std::str::from_utf8(h) {
                    let code = s
                        .strip_prefix("HTTP/")
                        .and_then(|r| r.split_whitespace().nth(1));
                    if let Some(code) = code {
                        rejected.set(!code.starts_with('2'));
                    }
                }
                true
            })
            .map_err(SegmentError::Curl)?;
        transfer
            .progress_function(|_, _, _, _| !cancel.is_cancelled())
            .map_err(SegmentError::Curl)?;
        transfer.perform()
    };

    let outcome = (|| {
        if let Err(e) = &result {
            if e.is_aborted_by_callback() {
                return Err(SegmentError::Cancelled);
            }
        }
        if let Some(e) = storage_error {
            return Err(SegmentError::Storage(e));
        }
        let code = easy.response_code().map_err(SegmentError::Curl)?;
        if code >= 300 {
            return Err(SegmentError::Http(code));
        }
        match (result, expected) {
            (Err(e), Some(expected)) if e.is_partial_file() => {
                return Err(SegmentError::PartialTransfer { expected, received })
            }
            (other, _) => other.map_err(SegmentError::Curl)?,
        }
        if let Some(expected) = expected {
            if received != expected {
                return Err(SegmentError::PartialTransfer { expected, received });
            }
        }
        writer.set_len(received).map_err(SegmentError::Storage)?;
        Ok(received)
    })();

    if outcome.is_err() {
        slot.rewind(received);
    }
    outcome
}
