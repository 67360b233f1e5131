//! Which segments of a plan are already on disk.

use super::Segment;

/// Completion flags for a fixed number of segments, packed one bit each
/// (segment 0 is the low bit of byte 0). The packed bytes are what the resume
/// sidecar stores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentBitmap {
    bits: Vec<u8>,
    count: usize,
}

impl SegmentBitmap {
    pub fn new(count: usize) -> Self {
        Self {
            bits: vec![0; count.div_ceil(8)],
            count,
        }
    }

    /// Rebuild from stored bytes. Missing bytes read as "not done"; bits past
    /// `count` are dropped.
    pub fn from_bytes(bytes: &[u8], count: usize) -> Self {
        let mut bitmap = Self::new(count);
        for (dst, src) in bitmap.bits.iter_mut().zip(bytes) {
            *dst = *src;
        }
        let tail = count % 8;
        if tail != 0 {
            if let Some(last) = bitmap.bits.last_mut() {
                *last &= (1u8 << tail) - 1;
            }
        }
        bitmap
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.bits.clone()
    }

    /// Out-of-range indices are ignored.
    pub fn set_completed(&mut self, index: usize) {
        if index < self.count {
            self.bits[index / 8] |= 1 << (index % 8);
        }
    }

    pub fn is_completed(&self, index: usize) -> bool {
        index < self.count && self.bits[index / 8] & (1 << (index % 8)) != 0
    }

    pub fn completed_count(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_count() == self.count
    }

    /// Sum of the lengths of completed segments in `plan`.
    pub fn completed_bytes(&self, plan: &[Segment]) -> u64 {
        plan.iter()
            .enumerate()
            .filter(|&(i, _)| self.is_completed(i))
            .map(|(_, s)| s.len())
            .sum()
    }

    /// Segments of `plan` still to fetch, paired with their index.
    pub fn incomplete(&self, plan: &[Segment]) -> Vec<(usize, Segment)> {
        plan.iter()
            .copied()
            .enumerate()
            .filter(|&(i, _)| !self.is_completed(i))
            .collect()
    }
}
