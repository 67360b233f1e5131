//! Map request failures to retry kinds.

use super::error::SegmentError;
use super::policy::ErrorKind;

pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::ServerError(code),
        _ => ErrorKind::Permanent,
    }
}

pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        ErrorKind::Timeout
    } else if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        ErrorKind::Connection
    } else {
        ErrorKind::Permanent
    }
}

pub fn classify(e: &SegmentError) -> ErrorKind {
    match e {
        SegmentError::Curl(ce) => classify_curl_error(ce),
        SegmentError::Http(code) => classify_http_status(*code),
        // short body: the connection dropped mid-range
        SegmentError::PartialTransfer { .. } => ErrorKind::Connection,
        SegmentError::InvalidRangeResponse(_)
        | SegmentError::Storage(_)
        | SegmentError::Cancelled => ErrorKind::Permanent,
    }
}
