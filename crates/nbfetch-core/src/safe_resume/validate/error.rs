//! Error types for safe-resume validation.

use std::fmt;

/// Why a partial file cannot be resumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The server sent no ETag, or only a weak one.
    NoStrongValidator,
    /// ETag, size or URL differ from what the sidecar recorded.
    RemoteChanged {
        etag_changed: bool,
        size_changed: bool,
        url_changed: bool,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValidationErrorKind::NoStrongValidator => {
                write!(f, "no strong ETag to validate the partial file")
            }
            ValidationErrorKind::RemoteChanged {
                etag_changed,
                size_changed,
                url_changed,
            } => {
                let what: Vec<&str> = [
                    (*etag_changed, "ETag"),
                    (*size_changed, "size"),
                    (*url_changed, "URL"),
                ]
                .iter()
                .filter(|(changed, _)| *changed)
                .map(|(_, name)| *name)
                .collect();
                write!(f, "remote resource changed ({})", what.join(", "))
            }
        }
    }
}

impl std::error::Error for ValidationError {}
