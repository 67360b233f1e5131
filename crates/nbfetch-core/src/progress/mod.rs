//! Batch progress: atomic counters written by transfers, sampled and rendered
//! by a background reporter at a bounded rate.

mod board;
mod reporter;
mod sink;

pub use board::{ProgressBoard, ProgressSnapshot, TaskSlot, TaskSnapshot};
pub use reporter::{render_line, summary_line, ProgressReporter};
pub use sink::{ConsoleSink, MemorySink, ReportSink, TracingSink};
