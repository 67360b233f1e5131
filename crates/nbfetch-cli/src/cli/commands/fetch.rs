//! `nbfetch fetch`: collect and download.

use std::sync::Arc;

use anyhow::Result;
use nbfetch_core::config::FetchConfig;
use nbfetch_core::progress::ConsoleSink;
use nbfetch_core::Scheduler;

use super::collect::collect_tasks;
use crate::cli::FetchArgs;

/// Returns `Ok(true)` when every task succeeded.
pub async fn run_fetch(cfg: FetchConfig, args: &FetchArgs) -> Result<bool> {
    let collect = &args.collect;
    let tasks = collect_tasks(&cfg, collect).await?;
    if tasks.is_empty() {
        eprintln!("no matching files for {}..{}", collect.start_date, collect.end_date);
    }

    let scheduler = if args.log_progress {
        Scheduler::with_tracing(cfg)
    } else {
        Scheduler::new(cfg, Arc::new(ConsoleSink))
    };
    let cancel = scheduler.cancel_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            eprintln!("cancelling...");
            cancel.cancel();
        }
    });

    let results = scheduler.submit(tasks).await;
    ctrl_c.abort();
    let results = results?;
    Ok(results.iter().all(|r| r.is_success()))
}
