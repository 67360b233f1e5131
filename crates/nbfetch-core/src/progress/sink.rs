//! Where progress and result lines go.

use std::sync::Mutex;

/// Receives rendered progress, per-task and summary lines.
pub trait ReportSink: Send + Sync {
    fn emit(&self, line: &str);
}

/// Emits through `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn emit(&self, line: &str) {
        tracing::info!(target: "nbfetch::progress", "{}", line);
    }
}

/// Writes lines to stderr so stdout stays clean for listings.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn emit(&self, line: &str) {
        eprintln!("{}", line);
    }
}

/// Collects lines in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ReportSink for MemorySink {
    fn emit(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line.to_string());
    }
}
