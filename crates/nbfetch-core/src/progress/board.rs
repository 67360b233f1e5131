//! Shared progress counters.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::transfer::TaskId;

const UNKNOWN_TOTAL: u64 = u64::MAX;

/// Byte counters for one task. Written from curl callbacks, read by the sampler.
#[derive(Debug)]
pub struct TaskSlot {
    done: AtomicU64,
    total: AtomicU64,
}

impl Default for TaskSlot {
    fn default() -> Self {
        Self {
            done: AtomicU64::new(0),
            total: AtomicU64::new(UNKNOWN_TOTAL),
        }
    }
}

impl TaskSlot {
    pub fn add(&self, n: u64) {
        self.done.fetch_add(n, Ordering::Relaxed);
    }

    /// Take back bytes counted by an attempt that failed.
    pub fn rewind(&self, n: u64) {
        let _ = self
            .done
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| {
                Some(d.saturating_sub(n))
            });
    }

    pub fn set_done(&self, n: u64) {
        self.done.store(n, Ordering::Relaxed);
    }

    pub fn set_total(&self, total: Option<u64>) {
        self.total
            .store(total.unwrap_or(UNKNOWN_TOTAL), Ordering::Relaxed);
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> Option<u64> {
        match self.total.load(Ordering::Relaxed) {
            UNKNOWN_TOTAL => None,
            n => Some(n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub done: u64,
    pub total: Option<u64>,
}

/// Point-in-time copy of the board.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub tasks: Vec<TaskSnapshot>,
    pub bytes_done: u64,
    /// Sum of known totals only.
    pub bytes_total: u64,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub total_tasks: usize,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Average rate since the board was created (0 if no time has passed).
    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / secs
    }

    pub fn finished_tasks(&self) -> usize {
        self.completed + self.failed
    }
}

/// One slot per task plus batch counters. No locks on the transfer path.
#[derive(Debug)]
pub struct ProgressBoard {
    slots: Vec<(TaskId, Arc<TaskSlot>)>,
    active: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    started: Instant,
}

impl ProgressBoard {
    pub fn new(ids: impl IntoIterator<Item = TaskId>) -> Self {
        Self {
            slots: ids
                .into_iter()
                .map(|id| (id, Arc::new(TaskSlot::default())))
                .collect(),
            active: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    /// Slot for the task at `index` in submission order.
    pub fn slot(&self, index: usize) -> Option<Arc<TaskSlot>> {
        self.slots.get(index).map(|(_, s)| Arc::clone(s))
    }

    pub fn task_started(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn task_finished(&self, success: bool) {
        let _ = self
            .active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            });
        if success {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Counts a task that never ran (cancelled before dispatch).
    pub fn task_skipped(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let tasks: Vec<TaskSnapshot> = self
            .slots
            .iter()
            .map(|(id, slot)| TaskSnapshot {
                id: id.clone(),
                done: slot.done(),
                total: slot.total(),
            })
            .collect();
        ProgressSnapshot {
            bytes_done: tasks.iter().map(|t| t.done).sum(),
            bytes_total: tasks.iter().filter_map(|t| t.total).sum(),
            active: self.active.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            total_tasks: tasks.len(),
            elapsed: self.started.elapsed(),
            tasks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(n: usize) -> ProgressBoard {
        ProgressBoard::new((0..n).map(|i| TaskId::new(format!("t{}", i))))
    }

    #[test]
    fn slot_add_and_rewind() {
        let slot = TaskSlot::default();
        slot.add(100);
        slot.add(50);
        slot.rewind(50);
        assert_eq!(slot.done(), 100);
        slot.rewind(1000);
        assert_eq!(slot.done(), 0);
        assert_eq!(slot.total(), None);
        slot.set_total(Some(0));
        assert_eq!(slot.total(), Some(0));
    }

    #[test]
    fn snapshot_sums_known_totals_only() {
        let b = board(3);
        b.slot(0).unwrap().set_total(Some(1000));
        b.slot(0).unwrap().add(400);
        b.slot(1).unwrap().add(30);
        b.slot(2).unwrap().set_total(Some(500));
        let s = b.snapshot();
        assert_eq!(s.bytes_done, 430);
        assert_eq!(s.bytes_total, 1500);
        assert_eq!(s.total_tasks, 3);
        assert_eq!(s.tasks[1].total, None);
        assert!(b.slot(3).is_none());
    }

    #[test]
    fn task_counters() {
        let b = board(3);
        b.task_started();
        b.task_started();
        b.task_finished(true);
        b.task_finished(false);
        b.task_skipped();
        let s = b.snapshot();
        assert_eq!(s.active, 0);
        assert_eq!(s.completed, 1);
        assert_eq!(s.failed, 2);
        assert_eq!(s.finished_tasks(), 3);
    }

    #[test]
    fn average_rate() {
        let s = ProgressSnapshot {
            tasks: Vec::new(),
            bytes_done: 500,
            bytes_total: 1000,
            active: 1,
            completed: 0,
            failed: 0,
            total_tasks: 1,
            elapsed: Duration::from_secs(5),
        };
        assert!((s.bytes_per_sec() - 100.0).abs() < 1e-9);

        let idle = ProgressSnapshot {
            elapsed: Duration::ZERO,
            bytes_done: 0,
            ..s
        };
        assert_eq!(idle.bytes_per_sec(), 0.0);
    }
}
