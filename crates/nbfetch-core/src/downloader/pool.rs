//! Pool of idle curl handles shared by all workers of a run.

use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

use curl::easy::Easy;

/// Bounded stack of idle `Easy` handles. Checking out never blocks: when the
/// pool is empty a fresh handle is created, and handles returned past
/// `capacity` are dropped (closing their connections).
#[derive(Debug)]
pub struct HandlePool {
    idle: Mutex<Vec<Easy>>,
    capacity: usize,
}

impl HandlePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn checkout(&self) -> PooledHandle<'_> {
        let easy = self
            .idle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop()
            .unwrap_or_else(Easy::new);
        PooledHandle {
            easy: Some(easy),
            pool: self,
        }
    }

    /// Number of handles waiting for reuse.
    pub fn idle(&self) -> usize {
        self.idle.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn give_back(&self, mut easy: Easy) {
        easy.reset();
        let mut idle = self.idle.lock().unwrap_or_else(|e| e.into_inner());
        if idle.len() < self.capacity {
            idle.push(easy);
        }
    }
}

/// A checked-out handle; returns itself to the pool on drop.
pub struct PooledHandle<'a> {
    easy: Option<Easy>,
    pool: &'a HandlePool,
}

impl Deref for PooledHandle<'_> {
    type Target = Easy;

    fn deref(&self) -> &Easy {
        // Only taken in Drop.
        self.easy.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for PooledHandle<'_> {
    fn deref_mut(&mut self) -> &mut Easy {
        self.easy.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledHandle<'_> {
    fn drop(&mut self) {
        if let Some(easy) = self.easy.take() {
            self.pool.give_back(easy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_reused() {
        let pool = HandlePool::new(2);
        assert_eq!(pool.idle(), 0);
        {
            let _a = pool.checkout();
            let _b = pool.checkout();
        }
        assert_eq!(pool.idle(), 2);
        let _c = pool.checkout();
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn capacity_bounds_idle_handles() {
        let pool = HandlePool::new(1);
        {
            let _a = pool.checkout();
            let _b = pool.checkout();
            let _c = pool.checkout();
        }
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn shared_across_threads() {
        let pool = std::sync::Arc::new(HandlePool::new(4));
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let pool = std::sync::Arc::clone(&pool);
                std::thread::spawn(move || {
                    let mut h = pool.checkout();
                    h.url("http://127.0.0.1:9/").unwrap();
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert!(pool.idle() <= 4);
    }
}
