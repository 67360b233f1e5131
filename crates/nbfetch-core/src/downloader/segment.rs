//! One HTTP Range GET written to storage at the segment offset.

use std::cell::RefCell;

use curl::easy::Easy;

use super::CurlOptions;
use crate::control::CancelToken;
use crate::fetch_head::parse_headers;
use crate::progress::TaskSlot;
use crate::retry::SegmentError;
use crate::segmenter::Segment;
use crate::storage::StorageWriter;

/// Downloads one segment. The response must be a `206` whose `Content-Range`
/// covers exactly `segment`, and the body must be exactly `segment.len()` bytes.
///
/// Bytes are added to `slot` as they arrive and taken back if the attempt fails,
/// so a retry never double counts.
pub fn download_one_segment(
    easy: &mut Easy,
    opts: &CurlOptions,
    url: &str,
    segment: Segment,
    writer: &StorageWriter,
    cancel: &CancelToken,
    slot: &TaskSlot,
) -> Result<u64, SegmentError> {
    opts.apply(easy, url).map_err(SegmentError::Curl)?;
    easy.range(&segment.curl_range())
        .map_err(SegmentError::Curl)?;

    let lines = RefCell::new(Vec::<String>::new());
    let mut accepted: Option<bool> = None;
    let mut overflow = false;
    let mut received = 0u64;
    let mut storage_error: Option<std::io::Error> = None;

    let result = {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|h| {
                if let Ok(s) = std::str::from_utf8(h) {
                    lines.borrow_mut().push(s.trim_end().to_string());
                }
                true
            })
            .map_err(SegmentError::Curl)?;
        transfer
            .write_function(|data| {
                let ok = *accepted.get_or_insert_with(|| {
                    let head = parse_headers(&lines.borrow());
                    head.status == 206
                        && head
                            .content_range
                            .is_some_and(|cr| segment.matches_content_range(cr.first, cr.last))
                });
                if !ok {
                    return Ok(0);
                }
                let n = data.len() as u64;
                if received + n > segment.len() {
                    overflow = true;
                    return Ok(0);
                }
                match writer.write_at(segment.start + received, data) {
                    Ok(()) => {
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
        if accepted == Some(false) || overflow {
            return Err(SegmentError::InvalidRangeResponse(code));
        }
        match result {
            Err(e) if e.is_partial_file() => {
                return Err(SegmentError::PartialTransfer {
                    expected: segment.len(),
                    received,
                })
            }
            other => other.map_err(SegmentError::Curl)?,
        }
        if code != 206 {
            return Err(SegmentError::InvalidRangeResponse(code));
        }
        if received != segment.len() {
            return Err(SegmentError::PartialTransfer {
                expected: segment.len(),
                received,
            });
        }
        Ok(received)
    })();

    if outcome.is_err() {
        slot.rewind(received);
    }
    outcome
}
