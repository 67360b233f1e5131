//! Segment download error type for retry classification.

use std::fmt;

/// Error returned by one request attempt (probe, segment or single stream).
/// Kept separate from `TransferError` so the retry loop can classify it first.
#[derive(Debug)]
pub enum SegmentError {
    /// Curl reported an error (timeout, connection, etc.).
    Curl(curl::Error),
    /// HTTP response had a non-2xx status.
    Http(u32),
    /// Server answered a ranged GET with something other than the requested 206.
    InvalidRangeResponse(u32),
    /// Transfer completed but fewer or more bytes arrived than the range length
    /// (e.g. server closed early).
    PartialTransfer { expected: u64, received: u64 },
    /// Disk/storage write failed (e.g. disk full, permission denied). Not retried.
    Storage(std::io::Error),
    /// The run's cancel token was set while the request was in flight.
    Cancelled,
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentError::Curl(e) => write!(f, "{}", e),
            SegmentError::Http(code) => write!(f, "HTTP {}", code),
            SegmentError::InvalidRangeResponse(code) => {
                write!(f, "expected 206 Partial Content, got HTTP {}", code)
            }
            SegmentError::PartialTransfer { expected, received } => {
                write!(f, "partial transfer: expected {} bytes, got {}", expected, received)
            }
            SegmentError::Storage(e) => write!(f, "storage: {}", e),
            SegmentError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for SegmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SegmentError::Curl(e) => Some(e),
            SegmentError::Storage(e) => Some(e),
            _ => None,
        }
    }
}
