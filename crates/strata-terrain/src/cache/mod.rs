//! Chunk-keyed concurrent terrain cache.
//!
//! Each chunk is generated at most once while its entry lives: the first
//! request inserts a [`TerrainFuture`] and queues the job, later requests share
//! that future. Jobs fetch the nine pre-erosion raw chunks they need through a
//! second, bounded cache and compute missing ones inline.

mod future;
mod raw;
mod worker;

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use strata_config::{CacheConfig, WorldConfig};
use tracing::{info, warn};

pub use future::TerrainFuture;

use self::raw::RawCache;
use self::worker::{Job, WorkerPool, thread_count};
use crate::chunk::{CHUNK_SIZE, ChunkCoord, ChunkTerrainData};
use crate::error::TerrainError;
use crate::pipeline::{RawChunk, SampleContext, TerrainGenerator};
use crate::pool::ObjectPool;

/// Something that can produce terrain chunks in two phases.
pub trait ChunkSource: Send + Sync + 'static {
    /// Pre-erosion data for one chunk. Must not block on other chunks.
    fn raw_chunk(&self, ctx: &mut SampleContext, coord: ChunkCoord) -> RawChunk;

    /// Final data for `coord` from the raw chunks of its 3×3 neighbourhood.
    fn finish_chunk(
        &self,
        ctx: &mut SampleContext,
        coord: ChunkCoord,
        neighbourhood: &[&RawChunk; 9],
        out: &mut ChunkTerrainData,
    );

    /// Height of one column without generating its chunk.
    fn sample_height(&self, ctx: &mut SampleContext, x: i32, z: i32) -> f32;
}

impl ChunkSource for TerrainGenerator {
    fn raw_chunk(&self, ctx: &mut SampleContext, coord: ChunkCoord) -> RawChunk {
        TerrainGenerator::raw_chunk(self, ctx, coord)
    }

    fn finish_chunk(
        &self,
        ctx: &mut SampleContext,
        coord: ChunkCoord,
        neighbourhood: &[&RawChunk; 9],
        out: &mut ChunkTerrainData,
    ) {
        TerrainGenerator::finish_chunk(self, ctx, coord, neighbourhood, out);
    }

    fn sample_height(&self, ctx: &mut SampleContext, x: i32, z: i32) -> f32 {
        TerrainGenerator::sample_height(self, ctx, x, z)
    }
}

/// Point-in-time counters for a [`TerrainCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Chunk entries (pending, ready or failed) currently held.
    pub futures: usize,
    /// Chunks generated so far.
    pub chunks_computed: u64,
    /// Raw chunks computed so far.
    pub raw_computed: u64,
    /// Raw chunks currently cached.
    pub raw_cached: usize,
    /// Idle chunk buffers in the pool.
    pub pool_free: usize,
    /// Chunk buffers ever allocated.
    pub pool_created: usize,
    /// Most idle chunk buffers the pool keeps.
    pub pool_capacity: usize,
    /// Sampling contexts ever allocated for direct height queries.
    pub query_contexts: usize,
    /// Worker threads.
    pub workers: usize,
}

struct Shared<S> {
    source: S,
    futures: DashMap<ChunkCoord, TerrainFuture>,
    raw: RawCache,
    chunks: ObjectPool<ChunkTerrainData>,
    contexts: ObjectPool<SampleContext>,
    computed: AtomicU64,
}

impl<S: ChunkSource> Shared<S> {
    fn compute(&self, ctx: &mut SampleContext, coord: ChunkCoord) -> Arc<ChunkTerrainData> {
        let neighbours = coord.neighborhood();
        let mut raws: Vec<Arc<RawChunk>> = Vec::with_capacity(9);
        for c in neighbours {
            let raw = self
                .raw
                .get_or_compute(c, || self.source.raw_chunk(ctx, c));
            raws.push(raw);
        }
        let refs: [&RawChunk; 9] = std::array::from_fn(|i| raws[i].as_ref());

        let mut out = self.chunks.take();
        self.source.finish_chunk(ctx, coord, &refs, &mut out);
        self.computed.fetch_add(1, Ordering::Relaxed);
        Arc::new(out)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Concurrent, memoizing front end over a [`ChunkSource`].
pub struct TerrainCache<S: ChunkSource = TerrainGenerator> {
    shared: Arc<Shared<S>>,
    pool: WorkerPool,
}

impl TerrainCache<TerrainGenerator> {
    /// Build a generator from `config` and a cache sized by `config.cache`.
    pub fn from_config(config: WorldConfig) -> Result<Self, TerrainError> {
        let cache = config.cache.clone();
        Self::new(TerrainGenerator::new(config)?, &cache)
    }
}

impl<S: ChunkSource> TerrainCache<S> {
    /// Start the worker pool around `source`.
    pub fn new(source: S, config: &CacheConfig) -> Result<Self, TerrainError> {
        let threads = thread_count(config.worker_threads);
        let pool = WorkerPool::new(threads)?;
        info!(
            workers = threads,
            raw_capacity = config.raw_capacity,
            "terrain cache started"
        );
        Ok(Self {
            shared: Arc::new(Shared {
                source,
                futures: DashMap::new(),
                raw: RawCache::new(config.raw_capacity),
                chunks: ObjectPool::new(config.chunk_pool_capacity, ChunkTerrainData::new),
                contexts: ObjectPool::new(threads, SampleContext::new),
                computed: AtomicU64::new(0),
            }),
            pool,
        })
    }

    /// The wrapped source.
    pub fn source(&self) -> &S {
        &self.shared.source
    }

    /// Future for `coord`, queueing generation if no entry exists.
    pub fn get_async(&self, coord: ChunkCoord) -> TerrainFuture {
        let future = match self.shared.futures.entry(coord) {
            Entry::Occupied(entry) => return entry.get().clone(),
            Entry::Vacant(entry) => entry.insert(TerrainFuture::new(coord)).clone(),
        };

        let shared = Arc::clone(&self.shared);
        let pending = future.clone();
        let job: Job = Box::new(move |ctx| {
            let result = catch_unwind(AssertUnwindSafe(|| shared.compute(ctx, coord)));
            match result {
                Ok(data) => pending.complete(Ok(data)),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(x = coord.x, z = coord.z, %message, "chunk generation panicked");
                    pending.complete(Err(TerrainError::WorkerPanicked { coord, message }));
                    // Rethrow so the worker resets its context.
                    std::panic::resume_unwind(payload);
                }
            }
        });
        if let Err(err) = self.pool.submit(job) {
            future.complete(Err(err));
        }
        future
    }

    /// Block until `coord` is generated.
    pub fn get_now(&self, coord: ChunkCoord) -> Result<Arc<ChunkTerrainData>, TerrainError> {
        self.get_async(coord).join()
    }

    /// Block for at most `timeout` waiting for `coord`.
    pub fn get_timeout(
        &self,
        coord: ChunkCoord,
        timeout: Duration,
    ) -> Result<Arc<ChunkTerrainData>, TerrainError> {
        self.get_async(coord).join_timeout(timeout)
    }

    /// Start generating `coord` without waiting.
    pub fn hint(&self, coord: ChunkCoord) {
        let _ = self.get_async(coord);
    }

    /// Remove a completed entry. When no one else holds the result its buffers
    /// return to the chunk pool. Pending entries are left alone.
    ///
    /// Returns `true` if an entry was removed.
    pub fn release(&self, coord: ChunkCoord) -> bool {
        let Some((_, future)) = self
            .shared
            .futures
            .remove_if(&coord, |_, future| future.is_complete())
        else {
            return false;
        };
        if let Some(data) = future.into_unique_data()
            && let Ok(chunk) = Arc::try_unwrap(data)
        {
            self.shared.chunks.restore(chunk);
        }
        true
    }

    /// Height of column `(x, z)`: the finished chunk's height when it is
    /// ready, otherwise a direct pre-erosion sample.
    pub fn sample_height(&self, x: i32, z: i32) -> f32 {
        let coord = ChunkCoord::containing(x, z);
        let ready = self
            .shared
            .futures
            .get(&coord)
            .and_then(|entry| entry.try_get());
        match ready {
            Some(Ok(data)) => {
                let lx = (x - coord.min_block_x()) as usize;
                let lz = (z - coord.min_block_z()) as usize;
                debug_assert!(lx < CHUNK_SIZE && lz < CHUNK_SIZE);
                data.height(lx, lz)
            }
            _ => {
                let mut ctx = self.shared.contexts.take();
                let height = self.shared.source.sample_height(&mut ctx, x, z);
                self.shared.contexts.restore(ctx);
                height
            }
        }
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            futures: self.shared.futures.len(),
            chunks_computed: self.shared.computed.load(Ordering::Relaxed),
            raw_computed: self.shared.raw.computed(),
            raw_cached: self.shared.raw.len(),
            pool_free: self.shared.chunks.free_count(),
            pool_created: self.shared.chunks.created_count(),
            pool_capacity: self.shared.chunks.capacity(),
            query_contexts: self.shared.contexts.created_count(),
            workers: self.pool.threads(),
        }
    }
}
