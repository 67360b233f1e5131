//! Metadata probing before a transfer.
//!
//! Tries `HEAD` first. Some mirrors refuse HEAD or do not advertise
//! `Accept-Ranges`, so a `GET` with `Range: bytes=0-0` is used as fallback or
//! confirmation: a `206` with `Content-Range: bytes 0-0/N` proves range support
//! and gives the size.

mod parse;

pub use parse::{parse_content_range, parse_headers, ContentRange};

use std::cell::RefCell;

use curl::easy::Easy;

use crate::control::CancelToken;
use crate::downloader::CurlOptions;
use crate::retry::SegmentError;

/// Metadata needed to plan a segmented download and validate a resume.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResult {
    /// Status of the last response (after redirects).
    pub status: u32,
    /// Total size in bytes when known.
    pub content_length: Option<u64>,
    /// Range support confirmed (advertised or proven by a 206).
    pub accept_ranges: bool,
    /// Raw `ETag`, quotes and any `W/` prefix kept.
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub content_range: Option<ContentRange>,
}

impl HeadResult {
    /// Interpret this response as the answer to a `Range: bytes=0-0` request.
    fn into_range_probe(mut self) -> Self {
        if self.status == 206 {
            if let Some(cr) = self.content_range {
                self.accept_ranges = true;
                self.content_length = cr.total;
            }
        } else {
            self.accept_ranges = false;
        }
        self
    }

    /// Keep validators from `head` when the range probe did not send them.
    fn merge_validators(mut self, head: &HeadResult) -> Self {
        if self.etag.is_none() {
            self.etag = head.etag.clone();
        }
        if self.last_modified.is_none() {
            self.last_modified = head.last_modified.clone();
        }
        if self.content_length.is_none() {
            self.content_length = head.content_length;
        }
        self
    }
}

/// Probe `url`. Blocking; runs on the transfer's thread.
pub fn probe(
    easy: &mut Easy,
    opts: &CurlOptions,
    url: &str,
    cancel: &CancelToken,
) -> Result<HeadResult, SegmentError> {
    match head_request(easy, opts, url, cancel) {
        Ok(head) if head.accept_ranges && head.content_length.is_some() => Ok(head),
        Ok(head) => match range_request(easy, opts, url, cancel) {
            Ok(r) => Ok(r.merge_validators(&head)),
            Err(SegmentError::Cancelled) => Err(SegmentError::Cancelled),
            Err(e) => {
                tracing::debug!(url, "range probe failed, keeping HEAD result: {}", e);
                Ok(head)
            }
        },
        Err(SegmentError::Cancelled) => Err(SegmentError::Cancelled),
        Err(e) => {
            tracing::debug!(url, "HEAD failed, probing with ranged GET: {}", e);
            range_request(easy, opts, url, cancel)
        }
    }
}

fn head_request(
    easy: &mut Easy,
    opts: &CurlOptions,
    url: &str,
    cancel: &CancelToken,
) -> Result<HeadResult, SegmentError> {
    opts.apply(easy, url).map_err(SegmentError::Curl)?;
    easy.nobody(true).map_err(SegmentError::Curl)?;
    let lines = perform_collecting(easy, cancel, 0)?;
    let head = parse_headers(&lines);
    if !(200..300).contains(&head.status) {
        return Err(SegmentError::Http(head.status));
    }
    Ok(head)
}

fn range_request(
    easy: &mut Easy,
    opts: &CurlOptions,
    url: &str,
    cancel: &CancelToken,
) -> Result<HeadResult, SegmentError> {
    opts.apply(easy, url).map_err(SegmentError::Curl)?;
    easy.range("0-0").map_err(SegmentError::Curl)?;
    let lines = perform_collecting(easy, cancel, 1)?;
    let probe = parse_headers(&lines);
    if !(200..300).contains(&probe.status) {
        return Err(SegmentError::Http(probe.status));
    }
    Ok(probe.into_range_probe())
}

/// Perform the configured request and return the header lines. Accepts at most
/// `body_limit` body bytes; a server that ignores the range is cut off once
/// its headers are in.
fn perform_collecting(
    easy: &mut Easy,
    cancel: &CancelToken,
    body_limit: usize,
) -> Result<Vec<String>, SegmentError> {
    let lines = RefCell::new(Vec::new());
    let mut body = 0usize;
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
                body += data.len();
                Ok(if body > body_limit { 0 } else { data.len() })
            })
            .map_err(SegmentError::Curl)?;
        transfer
            .progress_function(|_, _, _, _| !cancel.is_cancelled())
            .map_err(SegmentError::Curl)?;
        transfer.perform()
    };
    let lines = lines.into_inner();
    match result {
        Err(e) if e.is_aborted_by_callback() => Err(SegmentError::Cancelled),
        // Cut off on purpose after the headers arrived.
        Err(e) if e.is_write_error() && !lines.is_empty() => Ok(lines),
        Err(e) => Err(SegmentError::Curl(e)),
        Ok(()) => Ok(lines),
    }
}
