//! Segment type and range planning.

/// A single segment: byte range [start, end) (half-open).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Start offset (inclusive). Also the write offset in the `.part` file.
    pub start: u64,
    /// End offset (exclusive).
    pub end: u64,
}

impl Segment {
    /// Length of this segment in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Range in curl's `CURLOPT_RANGE` form (inclusive end, no `bytes=` prefix).
    pub fn curl_range(&self) -> String {
        format!("{}-{}", self.start, self.end.saturating_sub(1))
    }

    /// Whether a `Content-Range: bytes a-b/n` response covers exactly this segment.
    pub fn matches_content_range(&self, first: u64, last: u64) -> bool {
        first == self.start && last.checked_add(1) == Some(self.end)
    }
}

/// Builds a segment plan for a given total size and segment count.
///
/// Segments are as equal as possible; the first `total_size % n` segments are
/// one byte longer. Never yields empty segments: the count is clamped to
/// `total_size`. Returns an empty vec if `total_size` or `segment_count` is 0.
pub fn plan_segments(total_size: u64, segment_count: usize) -> Vec<Segment> {
    if total_size == 0 || segment_count == 0 {
        return Vec::new();
    }

    let segment_count = (segment_count as u64).min(total_size);
    let base = total_size / segment_count;
    let remainder = total_size % segment_count;

    let mut out = Vec::with_capacity(segment_count as usize);
    let mut offset = 0u64;

    for i in 0..segment_count {
        let len = base + u64::from(i < remainder);
        out.push(Segment {
            start: offset,
            end: offset + len,
        });
        offset += len;
    }

    out
}
