//! Walks dates → builds → files and turns matches into download tasks.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;

use super::dates::date_url;
use super::fetch::fetch_listing;
use super::parse::{matches_python_version, parse_build_dirs, parse_file_rows};
use crate::config::FetchConfig;
use crate::size::parse_size;
use crate::url_model::filename_from_href;
use crate::transfer::{DownloadTask, TaskId};

/// Source of listing pages.
pub trait ListingSource {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Fetches pages over HTTP with curl.
#[derive(Debug, Clone)]
pub struct HttpListing {
    pub headers: BTreeMap<String, String>,
    pub verify_tls: bool,
}

impl ListingSource for HttpListing {
    fn fetch(&self, url: &str) -> Result<String> {
        fetch_listing(url, &self.headers, self.verify_tls)
    }
}

pub struct Collector<S = HttpListing> {
    config: FetchConfig,
    source: S,
}

impl Collector<HttpListing> {
    pub fn new(config: FetchConfig) -> Self {
        let source = HttpListing {
            headers: config.request_headers.clone(),
            verify_tls: config.verify_tls,
        };
        Self { config, source }
    }
}

impl<S: ListingSource> Collector<S> {
    pub fn with_source(config: FetchConfig, source: S) -> Self {
        Self { config, source }
    }

    /// Tasks for every matching file under `dates`. A date or build whose page
    /// cannot be fetched is logged and skipped. Blocking.
    pub fn collect(&self, dates: &[String], python_version: Option<&str>) -> Vec<DownloadTask> {
        let listing = &self.config.listing;
        let mut tasks = Vec::new();
        for date in dates {
            let day_url = date_url(&listing.base_url, date);
            let page = match self.source.fetch(&day_url) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(date = %date, "listing unavailable: {:#}", e);
                    continue;
                }
            };
            let builds = parse_build_dirs(&page, &listing.branch_prefix, &listing.build_suffix);
            if builds.is_empty() {
                tracing::warn!(date = %date, "no matching builds");
            }
            for build in builds {
                tasks.extend(self.collect_build(date, &day_url, &build, python_version));
            }
        }
        tracing::info!(files = tasks.len(), dates = dates.len(), "collected");
        tasks
    }

    fn collect_build(
        &self,
        date: &str,
        day_url: &str,
        build: &str,
        python_version: Option<&str>,
    ) -> Vec<DownloadTask> {
        let listing = &self.config.listing;
        let build_url = format!("{}{}{}", day_url, build, listing.platform_path);
        let page = match self.source.fetch(&build_url) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(build = %build, "build listing unavailable: {:#}", e);
                return Vec::new();
            }
        };
        let build_id = build.trim_matches('/');
        let mut out = Vec::new();
        for row in parse_file_rows(&page, &listing.file_extension) {
            let Some(filename) = filename_from_href(&row.href) else {
                continue;
            };
            if python_version.is_some_and(|tag| !matches_python_version(&filename, tag)) {
                continue;
            }
            let url = match url::Url::parse(&build_url).and_then(|base| base.join(&row.href)) {
                Ok(u) => u.to_string(),
                Err(e) => {
                    tracing::warn!(href = %row.href, "unusable link: {}", e);
                    continue;
                }
            };
            let size = parse_size(&row.size_text);
            if size.is_none() && row.size_text != "-" {
                tracing::warn!(file = %filename, size = %row.size_text, "unparseable size");
            }
            let dest: PathBuf = self
                .config
                .download_dir
                .join(date)
                .join(build_id)
                .join(&filename);
            let id = TaskId::new(format!("{}/{}/{}", date, build_id, filename));
            out.push(
                DownloadTask::from_config(id, url, dest, size, &self.config)
                    .with_header("Referer", build_url.clone()),
            );
        }
        tracing::info!(build = %build_id, files = out.len(), "found files");
        out
    }
}
