//! Safe resume: a JSON sidecar next to each `.part` file and the validator
//! check that decides whether its completed segments can be trusted.
//!
//! A resume is only allowed against a strong ETag that is byte-identical to
//! the one recorded when the partial was started, with the same size and URL.
//! Anything else means the remote may have changed and the partial is discarded.

mod state;
mod validate;

pub use state::{sidecar_path, ResumeState, SIDECAR_SUFFIX};
pub use validate::{is_strong_etag, validate_for_resume, ValidationError, ValidationErrorKind};
