use std::path::PathBuf;

use crate::retry::SegmentError;
use crate::safe_resume::ValidationError;

/// Why a task failed.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("network error: {message}")]
    Network { message: String },
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cancelled")]
    Cancelled,
    #[error("resume validation failed: {0}")]
    ValidatorMismatch(#[from] ValidationError),
}

/// Fieldless mirror of `TransferError` for tallies and matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Network,
    SizeMismatch,
    Io,
    Cancelled,
    ValidatorMismatch,
}

impl TransferError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TransferError::Network { .. } => FailureKind::Network,
            TransferError::SizeMismatch { .. } => FailureKind::SizeMismatch,
            TransferError::Io { .. } => FailureKind::Io,
            TransferError::Cancelled => FailureKind::Cancelled,
            TransferError::ValidatorMismatch(_) => FailureKind::ValidatorMismatch,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TransferError::Io {
            path: path.into(),
            source,
        }
    }

    /// Map the last request error after retries. `part` is the file storage
    /// errors refer to.
    pub(crate) fn from_segment(e: SegmentError, part: &std::path::Path) -> Self {
        match e {
            SegmentError::Cancelled => TransferError::Cancelled,
            SegmentError::Storage(source) => TransferError::io(part, source),
            SegmentError::PartialTransfer { expected, received } => TransferError::SizeMismatch {
                expected,
                actual: received,
            },
            other @ (SegmentError::Curl(_)
            | SegmentError::Http(_)
            | SegmentError::InvalidRangeResponse(_)) => TransferError::Network {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn segment_errors_map_to_kinds() {
        let part = Path::new("a.whl.part");
        let cases = [
            (SegmentError::Http(404), FailureKind::Network),
            (SegmentError::InvalidRangeResponse(200), FailureKind::Network),
            (SegmentError::Cancelled, FailureKind::Cancelled),
            (
                SegmentError::PartialTransfer {
                    expected: 10,
                    received: 4,
                },
                FailureKind::SizeMismatch,
            ),
            (
                SegmentError::Storage(std::io::Error::new(std::io::ErrorKind::Other, "disk full")),
                FailureKind::Io,
            ),
        ];
        for (e, kind) in cases {
            assert_eq!(TransferError::from_segment(e, part).kind(), kind);
        }
    }

    #[test]
    fn messages() {
        let e = TransferError::from_segment(SegmentError::Http(500), Path::new("x"));
        assert_eq!(e.to_string(), "network error: HTTP 500");
        let e = TransferError::SizeMismatch {
            expected: 1000,
            actual: 998,
        };
        assert_eq!(e.to_string(), "size mismatch: expected 1000 bytes, got 998");
        let e = TransferError::io(
            "d/a.whl.part",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(e.to_string().starts_with("I/O error on d/a.whl.part"));
    }
}
