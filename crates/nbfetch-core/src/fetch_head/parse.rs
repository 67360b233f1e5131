//! Parse HTTP response header lines into HeadResult.

use super::HeadResult;

/// `Content-Range: bytes first-last/total` (total is `None` for `*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub first: u64,
    pub last: u64,
    pub total: Option<u64>,
}

/// Parse a `Content-Range` value. Unsatisfied ranges (`bytes */N`) yield `None`.
pub fn parse_content_range(value: &str) -> Option<ContentRange> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = rest.split_once('/')?;
    let (first, last) = range.trim().split_once('-')?;
    let first: u64 = first.trim().parse().ok()?;
    let last: u64 = last.trim().parse().ok()?;
    if last < first {
        return None;
    }
    let total = match total.trim() {
        "*" => None,
        t => Some(t.parse().ok()?),
    };
    Some(ContentRange { first, last, total })
}

/// Parse collected header lines. Every status line starts a new response
/// block, so only the headers of the final response after redirects count.
pub fn parse_headers(lines: &[String]) -> HeadResult {
    let mut out = HeadResult::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            out = HeadResult {
                status: line
                    .split_whitespace()
                    .nth(1)
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(0),
                ..HeadResult::default()
            };
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.parse::<u64>() {
                    out.content_length = Some(n);
                }
            } else if name.eq_ignore_ascii_case("accept-ranges") {
                out.accept_ranges = value.eq_ignore_ascii_case("bytes");
            } else if name.eq_ignore_ascii_case("etag") {
                out.etag = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("last-modified") {
                out.last_modified = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("content-range") {
                out.content_range = parse_content_range(value);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_headers_content_length_and_ranges() {
        let r = parse_headers(&owned(&[
            "HTTP/1.1 200 OK",
            "Content-Length: 12345",
            "Accept-Ranges: bytes",
        ]));
        assert_eq!(r.status, 200);
        assert_eq!(r.content_length, Some(12345));
        assert!(r.accept_ranges);
        assert!(r.etag.is_none());
    }

    #[test]
    fn parse_headers_etag_and_last_modified() {
        let r = parse_headers(&owned(&[
            "HTTP/1.1 200 OK",
            "ETag: W/\"abc-123\"",
            "Last-Modified: Wed, 21 Oct 2015 07:28:00 GMT",
        ]));
        assert_eq!(r.etag.as_deref(), Some("W/\"abc-123\""));
        assert_eq!(
            r.last_modified.as_deref(),
            Some("Wed, 21 Oct 2015 07:28:00 GMT")
        );
    }

    #[test]
    fn parse_headers_no_ranges() {
        let r = parse_headers(&owned(&[
            "HTTP/1.1 200 OK",
            "Content-Length: 999",
            "Accept-Ranges: none",
        ]));
        assert_eq!(r.content_length, Some(999));
        assert!(!r.accept_ranges);
    }

    #[test]
    fn parse_headers_only_last_response_counts() {
        let r = parse_headers(&owned(&[
            "HTTP/1.1 302 Found",
            "Location: /mirror/a.whl",
            "Content-Length: 0",
            "",
            "HTTP/1.1 200 OK",
            "Content-Length: 77",
        ]));
        assert_eq!(r.status, 200);
        assert_eq!(r.content_length, Some(77));
    }

    #[test]
    fn content_range_forms() {
        assert_eq!(
            parse_content_range("bytes 0-0/5000"),
            Some(ContentRange {
                first: 0,
                last: 0,
                total: Some(5000)
            })
        );
        assert_eq!(
            parse_content_range("bytes 100-199/*"),
            Some(ContentRange {
                first: 100,
                last: 199,
                total: None
            })
        );
        assert_eq!(parse_content_range("bytes */5000"), None);
        assert_eq!(parse_content_range("items 0-1/2"), None);
        assert_eq!(parse_content_range("bytes 9-3/20"), None);
    }
}
