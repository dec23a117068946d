//! Procedural terrain: cellular archetype blending, continent shaping, river
//! and lake carving, droplet erosion, and a concurrent chunk cache.
//!
//! [`TerrainGenerator`] is the pure, deterministic pipeline. [`TerrainCache`]
//! runs it on a worker pool and memoizes finished chunks.

mod blend;
mod cell;
mod chunk;
mod continent;
mod erosion;
mod error;
mod noise_field;
mod pipeline;
mod pool;

pub mod cache;
pub mod river;
pub mod seed;

pub use blend::{Archetype, BlendResult, BlendScratch, TerrainBlender};
pub use cache::{CacheStats, ChunkSource, TerrainCache, TerrainFuture};
pub use cell::{CellField, CellPoint, NearestCells, pack_cell, unpack_cell};
pub use chunk::{
    ArchetypeId, CHUNK_AREA, CHUNK_SIZE, ChunkCoord, ChunkTerrainData, TerrainClass, column_index,
};
pub use continent::{ContinentField, ContinentSample};
pub use erosion::{
    Eroder, ErosionBrush, ErosionWindow, HeightTile, WINDOW_STRIDE, WINDOWS_PER_CHUNK,
};
pub use error::TerrainError;
pub use noise_field::{FractalNoise, HeightNoise};
pub use pipeline::{CarveSite, RawChunk, Sample, SampleContext, TerrainGenerator};
pub use pool::ObjectPool;
pub use river::{RiverNetwork, RiverScratch, RiverSite};
