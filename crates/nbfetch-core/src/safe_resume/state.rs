//! Resume sidecar: `<dest>.part.json`.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::segmenter::SegmentBitmap;

pub const SIDECAR_SUFFIX: &str = ".part.json";

/// `<dest>.part.json` for a destination path.
pub fn sidecar_path(dest: &Path) -> PathBuf {
    let mut o = dest.as_os_str().to_owned();
    o.push(SIDECAR_SUFFIX);
    PathBuf::from(o)
}

/// What is known about one partial file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeState {
    pub url: String,
    pub etag: String,
    pub total_size: u64,
    pub segment_count: usize,
    /// Completed-segment bitmap bytes (see `SegmentBitmap::to_bytes`).
    pub completed: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl ResumeState {
    pub fn new(url: &str, etag: &str, total_size: u64, segment_count: usize) -> Self {
        Self {
            url: url.to_string(),
            etag: etag.to_string(),
            total_size,
            segment_count,
            completed: SegmentBitmap::new(segment_count).to_bytes(),
            last_modified: None,
        }
    }

    pub fn bitmap(&self) -> SegmentBitmap {
        SegmentBitmap::from_bytes(&self.completed, self.segment_count)
    }

    pub fn set_bitmap(&mut self, bitmap: &SegmentBitmap) {
        self.completed = bitmap.to_bytes();
    }

    /// Whether the recorded segment count can describe a plan for `total`
    /// bytes: non-zero, at most `limit`, and no larger than `total` (planning
    /// never yields empty segments).
    pub fn has_plausible_segments(&self, total: u64, limit: usize) -> bool {
        let count = self.segment_count;
        count > 0 && count <= limit && count as u64 <= total
    }

    /// Read a sidecar. Missing file is `Ok(None)`; unreadable JSON is `InvalidData`.
    pub fn load(path: &Path) -> io::Result<Option<Self>> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Write via a temp file and rename so a crash never leaves half a sidecar.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)
    }
}
