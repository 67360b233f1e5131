use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::FetchConfig;

/// Caller-chosen identifier, unique within one `submit`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A file to fetch. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub id: TaskId,
    pub url: String,
    pub dest: PathBuf,
    /// Size announced by the listing, if any. A probed size takes precedence.
    pub expected_size: Option<u64>,
    /// Parallel connections when the server supports ranges.
    pub segments: usize,
    /// Retries after the first attempt, per request.
    pub retries: u32,
    pub headers: BTreeMap<String, String>,
}

impl DownloadTask {
    /// Task with the default segment and retry counts and no extra headers.
    pub fn new(id: TaskId, url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        let defaults = FetchConfig::default();
        Self {
            id,
            url: url.into(),
            dest: dest.into(),
            expected_size: None,
            segments: defaults.segments_per_task,
            retries: defaults.retries_per_segment,
            headers: BTreeMap::new(),
        }
    }

    /// Task with segments, retries and request headers taken from `cfg`.
    pub fn from_config(
        id: TaskId,
        url: impl Into<String>,
        dest: impl Into<PathBuf>,
        expected_size: Option<u64>,
        cfg: &FetchConfig,
    ) -> Self {
        Self {
            expected_size,
            segments: cfg.segments_per_task,
            retries: cfg.retries_per_segment,
            headers: cfg.request_headers.clone(),
            ..Self::new(id, url, dest)
        }
    }

    pub fn with_expected_size(mut self, size: Option<u64>) -> Self {
        self.expected_size = size;
        self
    }

    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = segments.max(1);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}
