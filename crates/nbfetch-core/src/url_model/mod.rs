//! Local filenames from listing links.
//!
//! Links are percent-decoded and sanitized so a hostile listing can never
//! write outside the build directory.

mod sanitize;

pub use sanitize::sanitize_filename;

/// Filename for a link such as `mindspore-2.5.0%2Bcpu-cp39-...whl?x=1`:
/// last non-empty path segment, query and fragment dropped, percent-decoded,
/// sanitized. `None` when nothing usable remains.
pub fn filename_from_href(href: &str) -> Option<String> {
    let path = href.split(|c| c == '?' || c == '#').next().unwrap_or(href);
    let segment = path.split('/').filter(|s| !s.is_empty()).last()?;
    let decoded = urlencoding::decode(segment).ok()?;
    let name = sanitize_filename(&decoded);
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name)
}
