//! Configuration loaded from `$XDG_CONFIG_HOME/nbfetch/config.toml`.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Where the listing lives and how builds and files are named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListingConfig {
    /// Root of the date-partitioned listing; must end with `/`.
    pub base_url: String,
    pub branch_prefix: String,
    pub build_suffix: String,
    /// Path under each build directory that holds the artifacts.
    pub platform_path: String,
    pub file_extension: String,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://repo.mindspore.cn/mindspore/mindspore/version/".to_string(),
            branch_prefix: "master_".to_string(),
            build_suffix: "_newest/".to_string(),
            platform_path: "unified/aarch64/".to_string(),
            file_extension: ".whl".to_string(),
        }
    }
}

/// Headers a desktop browser would send; some mirrors reject bare clients.
pub fn default_request_headers() -> BTreeMap<String, String> {
    [
        (
            "User-Agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        ),
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
        ("Accept-Language", "en-US,en;q=0.5"),
        ("Connection", "keep-alive"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Engine and collector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Tasks transferring at once.
    pub max_workers: usize,
    /// Connections per task when the server supports ranges.
    pub segments_per_task: usize,
    /// Retries after the first attempt, per segment (and per probe / single stream).
    pub retries_per_segment: u32,
    pub overwrite_existing: bool,
    /// Resume partial files when the server's strong ETag still matches.
    pub etag_validation: bool,
    /// Per-task cap split across its connections; 0 = unlimited.
    pub rate_limit_bytes_per_sec: u64,
    pub request_headers: BTreeMap<String, String>,
    pub download_dir: PathBuf,
    /// Files smaller than this are fetched with a single request.
    pub min_split_bytes: u64,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub connect_timeout_secs: u64,
    pub verify_tls: bool,
    pub progress_interval_ms: u64,
    pub listing: ListingConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_workers: 3,
            segments_per_task: 5,
            retries_per_segment: 3,
            overwrite_existing: true,
            etag_validation: true,
            rate_limit_bytes_per_sec: 0,
            request_headers: default_request_headers(),
            download_dir: PathBuf::from("downloads"),
            min_split_bytes: 1024 * 1024,
            retry_base_delay_ms: 250,
            retry_max_delay_ms: 30_000,
            connect_timeout_secs: 30,
            verify_tls: true,
            progress_interval_ms: 500,
            listing: ListingConfig::default(),
        }
    }
}

impl FetchConfig {
    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            bail!("max_workers must be at least 1");
        }
        if self.segments_per_task == 0 {
            bail!("segments_per_task must be at least 1");
        }
        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            bail!(
                "retry_base_delay_ms ({}) exceeds retry_max_delay_ms ({})",
                self.retry_base_delay_ms,
                self.retry_max_delay_ms
            );
        }
        if !self.listing.base_url.ends_with('/') {
            bail!("listing.base_url must end with '/'");
        }
        Ok(())
    }

    /// Retry policy for requests of tasks built with `retries` retries.
    pub fn retry_policy(&self, retries: u32) -> RetryPolicy {
        RetryPolicy::from_retries(
            retries,
            Duration::from_millis(self.retry_base_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
        )
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Upper bound on idle curl handles worth keeping.
    pub fn handle_pool_capacity(&self) -> usize {
        self.max_workers.max(1) * self.segments_per_task.max(1)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("nbfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load and validate an explicit config file.
pub fn load_from_path(path: &Path) -> Result<FetchConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: FetchConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
