#![allow(dead_code)]

pub mod range_server;

use std::collections::BTreeMap;
use std::path::Path;

use nbfetch_core::config::FetchConfig;

/// Deterministic body that makes misplaced bytes visible.
pub fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Config with fast retries and a small split threshold.
pub fn test_config(download_dir: &Path) -> FetchConfig {
    FetchConfig {
        download_dir: download_dir.to_path_buf(),
        min_split_bytes: 1024,
        retry_base_delay_ms: 5,
        retry_max_delay_ms: 20,
        progress_interval_ms: 20,
        connect_timeout_secs: 5,
        request_headers: BTreeMap::new(),
        ..FetchConfig::default()
    }
}
