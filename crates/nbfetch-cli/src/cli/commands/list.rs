//! `nbfetch list`: dry run of the collection.

use anyhow::Result;
use nbfetch_core::config::FetchConfig;
use nbfetch_core::size::format_binary;

use super::collect::collect_tasks;
use crate::cli::CollectArgs;

pub async fn run_list(cfg: FetchConfig, args: &CollectArgs) -> Result<()> {
    let tasks = collect_tasks(&cfg, args).await?;
    println!("{:<80} {:>12} DEST", "URL", "SIZE");
    for t in &tasks {
        let size = t
            .expected_size
            .map(format_binary)
            .unwrap_or_else(|| "-".to_string());
        println!("{:<80} {:>12} {}", t.url, size, t.dest.display());
    }
    eprintln!("{} file(s)", tasks.len());
    Ok(())
}
