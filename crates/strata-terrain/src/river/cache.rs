//! Bounded, lossy, sharded cache of region graphs.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tracing::trace;

use super::graph::{RegionGraph, RiverSegment};
use crate::cell::unpack_cell;
use crate::pool::ObjectPool;
use crate::seed::mix64;

fn segment_buffer() -> Vec<RiverSegment> {
    Vec::with_capacity(8)
}

/// Region graphs keyed by packed drainage cell.
///
/// Each shard is an independently locked LRU. Evicted graphs that nobody
/// else holds give their segment buffer back to the pool.
pub(crate) struct RegionCache {
    shards: Vec<Mutex<LruCache<u64, Arc<RegionGraph>>>>,
    pool: ObjectPool<Vec<RiverSegment>>,
    built: AtomicU64,
    evicted: AtomicU64,
}

impl RegionCache {
    pub(crate) fn new(capacity: usize, shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        let per_shard =
            NonZeroUsize::new(capacity.div_ceil(shard_count)).unwrap_or(NonZeroUsize::MIN);
        Self {
            shards: (0..shard_count)
                .map(|_| Mutex::new(LruCache::new(per_shard)))
                .collect(),
            pool: ObjectPool::new(capacity.min(4096), segment_buffer),
            built: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    fn shard(&self, key: u64) -> &Mutex<LruCache<u64, Arc<RegionGraph>>> {
        &self.shards[(mix64(key) % self.shards.len() as u64) as usize]
    }

    pub(crate) fn get(&self, key: u64) -> Option<Arc<RegionGraph>> {
        self.shard(key)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key)
            .cloned()
    }

    /// An empty segment buffer, recycled when possible.
    pub(crate) fn take_buffer(&self) -> Vec<RiverSegment> {
        let mut buffer = self.pool.take();
        buffer.clear();
        buffer
    }

    /// Publish a freshly built graph. If another thread published the same key
    /// first, its graph is returned and `graph` is recycled.
    pub(crate) fn insert(&self, graph: RegionGraph) -> Arc<RegionGraph> {
        self.built.fetch_add(1, Ordering::Relaxed);
        let key = graph.key;
        let graph = Arc::new(graph);
        let evicted = {
            let mut shard = self
                .shard(key)
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(existing) = shard.get(&key).cloned() {
                drop(shard);
                self.recycle(graph);
                return existing;
            }
            shard.push(key, Arc::clone(&graph))
        };
        if let Some((old_key, old)) = evicted {
            self.evicted.fetch_add(1, Ordering::Relaxed);
            let (cx, cz) = unpack_cell(old_key);
            trace!(cx, cz, "evicted region graph");
            self.recycle(old);
        }
        graph
    }

    fn recycle(&self, graph: Arc<RegionGraph>) {
        if let Ok(graph) = Arc::try_unwrap(graph) {
            let mut segments = graph.segments;
            segments.clear();
            self.pool.restore(segments);
        }
    }

    /// Graphs currently cached across all shards.
    pub(crate) fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len())
            .sum()
    }

    /// Graphs built so far, including ones that lost a publish race.
    pub(crate) fn built(&self) -> u64 {
        self.built.load(Ordering::Relaxed)
    }

    /// Graphs evicted so far.
    pub(crate) fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Idle segment buffers in the pool.
    #[cfg(test)]
    pub(crate) fn pooled_buffers(&self) -> usize {
        self.pool.free_count()
    }
}
