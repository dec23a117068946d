//! Free-list object pool for recycling large buffers between chunks.
//!
//! Chunk results, region-graph segment lists and one-off sampling contexts are
//! allocated once and handed back here when their owner is done with them, so
//! steady-state generation performs no large allocations.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A bounded, thread-safe pool of reusable values.
pub struct ObjectPool<T> {
    free: Mutex<Vec<T>>,
    capacity: usize,
    create: fn() -> T,
    created: AtomicUsize,
}

impl<T> ObjectPool<T> {
    /// Create a pool that keeps at most `capacity` idle values and builds new
    /// ones with `create`.
    pub fn new(capacity: usize, create: fn() -> T) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            create,
            created: AtomicUsize::new(0),
        }
    }

    /// Take an idle value, or create a new one when the pool is empty.
    ///
    /// A reused value keeps whatever contents it had; callers reset it.
    pub fn take(&self) -> T {
        let reused = self
            .free
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop();
        match reused {
            Some(value) => value,
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                (self.create)()
            }
        }
    }

    /// Hand a value back. Dropped instead when the pool is full.
    pub fn restore(&self, value: T) {
        let mut free = self
            .free
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if free.len() < self.capacity {
            free.push(value);
        }
    }

    /// Number of idle values currently held.
    pub fn free_count(&self) -> usize {
        self.free
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Total number of values ever created by this pool.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Maximum number of idle values retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_buffer() -> Vec<u32> {
        Vec::with_capacity(64)
    }

    #[test]
    fn test_pool_reuses_restored_values() {
        let pool = ObjectPool::new(4, new_buffer);
        let mut buf = pool.take();
        buf.push(7);
        assert_eq!(pool.created_count(), 1);

        pool.restore(buf);
        assert_eq!(pool.free_count(), 1);

        let again = pool.take();
        assert_eq!(again, vec![7], "reused value keeps its contents");
        assert_eq!(pool.created_count(), 1);
        assert_eq!(pool.free_count(), 0);
    }

    #[test]
    fn test_pool_drops_values_beyond_capacity() {
        let pool = ObjectPool::new(2, new_buffer);
        let values: Vec<_> = (0..5).map(|_| pool.take()).collect();
        assert_eq!(pool.created_count(), 5);
        for v in values {
            pool.restore(v);
        }
        assert_eq!(pool.free_count(), 2);
    }

    #[test]
    fn test_pool_bounded_allocation_over_many_cycles() {
        let pool = ObjectPool::new(8, new_buffer);
        for _ in 0..10_000 {
            let a = pool.take();
            let b = pool.take();
            pool.restore(a);
            pool.restore(b);
        }
        assert_eq!(pool.created_count(), 2);
    }

    #[test]
    fn test_pool_shared_between_threads() {
        let pool = std::sync::Arc::new(ObjectPool::new(16, new_buffer));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = std::sync::Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        let v = pool.take();
                        pool.restore(v);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(pool.created_count() <= 4);
        assert!(pool.free_count() <= 4);
    }
}
