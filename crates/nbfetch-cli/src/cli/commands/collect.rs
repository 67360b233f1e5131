//! Date range → download tasks, shared by `fetch` and `list`.

use anyhow::{Context, Result};
use nbfetch_core::config::FetchConfig;
use nbfetch_core::listing::{date_range, Collector};
use nbfetch_core::DownloadTask;

use crate::cli::CollectArgs;

/// Walk the listing for the requested dates. Page fetches block, so this runs
/// on the blocking pool.
pub async fn collect_tasks(cfg: &FetchConfig, args: &CollectArgs) -> Result<Vec<DownloadTask>> {
    let dates = date_range(&args.start_date, &args.end_date)?;
    let collector = Collector::new(cfg.clone());
    let python_version = args.python_version.clone();
    tokio::task::spawn_blocking(move || collector.collect(&dates, python_version.as_deref()))
        .await
        .context("listing collection")
}
