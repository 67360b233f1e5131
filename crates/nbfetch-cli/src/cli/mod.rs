//! CLI for nbfetch.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use nbfetch_core::config::{self, FetchConfig};

use commands::{run_fetch, run_list};

/// Top-level CLI for nbfetch.
#[derive(Debug, Parser)]
#[command(name = "nbfetch")]
#[command(about = "nbfetch: segmented, resumable downloads of nightly wheel builds", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Collect wheels for a date range and download them.
    Fetch(FetchArgs),

    /// Show what `fetch` would download, without downloading.
    List(CollectArgs),
}

/// Options shared by `fetch` and `list`.
#[derive(Debug, Clone, Args)]
pub struct CollectArgs {
    /// First build date, YYYYMMDD.
    #[arg(long, value_name = "YYYYMMDD")]
    pub start_date: String,

    /// Last build date (inclusive), YYYYMMDD.
    #[arg(long, value_name = "YYYYMMDD")]
    pub end_date: String,

    /// Root directory for downloads (overrides the config file).
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Files downloaded concurrently (overrides `max_workers`).
    #[arg(long, value_name = "N")]
    pub num_process: Option<usize>,

    /// Only wheels built for this Python tag, e.g. cp39.
    #[arg(long, value_name = "TAG")]
    pub python_version: Option<String>,

    /// Config file to use instead of the default location.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub collect: CollectArgs,

    /// Send progress and result lines to the log instead of stderr.
    #[arg(long)]
    pub log_progress: bool,
}

impl CollectArgs {
    /// Config from `--config` or the default location, with flag overrides applied.
    pub fn load_config(&self) -> Result<FetchConfig> {
        let cfg = match &self.config {
            Some(path) => config::load_from_path(path)?,
            None => config::load_or_init()?,
        };
        let cfg = self.apply_overrides(cfg);
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_overrides(&self, mut cfg: FetchConfig) -> FetchConfig {
        if let Some(dir) = &self.download_dir {
            cfg.download_dir = dir.clone();
        }
        if let Some(n) = self.num_process {
            cfg.max_workers = n;
        }
        cfg
    }
}

impl CliCommand {
    /// Parse arguments and run. `Ok(false)` means some downloads failed.
    pub async fn run_from_args() -> Result<bool> {
        let cli = Cli::parse();
        match cli.command {
            CliCommand::Fetch(args) => {
                let cfg = args.collect.load_config()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_fetch(cfg, &args).await
            }
            CliCommand::List(args) => {
                let cfg = args.load_config()?;
                run_list(cfg, &args).await?;
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests;
