//! Compares the recorded sidecar with the current probe.

mod error;

use crate::fetch_head::HeadResult;

use super::ResumeState;

pub use error::{ValidationError, ValidationErrorKind};

/// Weak validators (`W/"..."`) only promise semantic equivalence, not
/// byte-identical content, so they can't vouch for ranges.
pub fn is_strong_etag(etag: &str) -> bool {
    let etag = etag.trim();
    !etag.is_empty() && !etag.starts_with("W/")
}

/// Returns Ok(()) if the partial described by `state` can be resumed against
/// the current probe of `url`.
pub fn validate_for_resume(
    state: &ResumeState,
    url: &str,
    head: &HeadResult,
) -> Result<(), ValidationError> {
    let Some(current) = head.etag.as_deref().filter(|e| is_strong_etag(e)) else {
        return Err(ValidationError {
            kind: ValidationErrorKind::NoStrongValidator,
        });
    };

    let etag_changed = !is_strong_etag(&state.etag) || state.etag != current;
    let size_changed = head.content_length != Some(state.total_size);
    let url_changed = state.url != url;

    if etag_changed || size_changed || url_changed {
        return Err(ValidationError {
            kind: ValidationErrorKind::RemoteChanged {
                etag_changed,
                size_changed,
                url_changed,
            },
        });
    }
    Ok(())
}
