//! Bounded cache of pre-erosion raw chunks.
//!
//! Slots are `OnceLock`s: the first job needing a raw chunk computes it inline
//! and concurrent jobs needing the same one wait on the slot. Computing a raw
//! chunk never waits on anything else, so a fixed worker pool cannot deadlock.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use lru::LruCache;

use crate::chunk::ChunkCoord;
use crate::pipeline::RawChunk;

type RawSlot = Arc<OnceLock<Arc<RawChunk>>>;

pub(crate) struct RawCache {
    slots: Mutex<LruCache<ChunkCoord, RawSlot>>,
    computed: AtomicU64,
}

impl RawCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            computed: AtomicU64::new(0),
        }
    }

    /// The raw chunk at `coord`, computing it with `compute` on a miss.
    pub(crate) fn get_or_compute(
        &self,
        coord: ChunkCoord,
        compute: impl FnOnce() -> RawChunk,
    ) -> Arc<RawChunk> {
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match slots.get(&coord) {
                Some(slot) => Arc::clone(slot),
                None => {
                    let slot = RawSlot::default();
                    slots.push(coord, Arc::clone(&slot));
                    slot
                }
            }
        };
        Arc::clone(slot.get_or_init(|| {
            self.computed.fetch_add(1, Ordering::Relaxed);
            Arc::new(compute())
        }))
    }

    /// Raw chunks computed so far.
    pub(crate) fn computed(&self) -> u64 {
        self.computed.load(Ordering::Relaxed)
    }

    /// Raw chunk slots currently cached.
    pub(crate) fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
