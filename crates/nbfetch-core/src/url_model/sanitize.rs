//! Filename sanitization.

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Makes `name` safe as a single path component.
///
/// Separators, NUL and control characters become `_`. Leading and trailing
/// dots and spaces are trimmed so the result is never `.`/`..` or hidden. The
/// result is cut to 255 bytes on a char boundary.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');
    let mut take = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}
