//! Range math and segment planning.
//!
//! Splits a transfer into N contiguous, non-overlapping byte ranges and tracks
//! which ones are done in a bitmap that the resume sidecar persists.

mod bitmap;
mod range;

pub use bitmap::SegmentBitmap;
pub use range::{plan_segments, Segment};
