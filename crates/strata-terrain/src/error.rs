//! Errors observed by callers of the terrain cache.

use thiserror::Error;

use crate::chunk::ChunkCoord;

/// Errors returned while waiting for generated terrain.
///
/// `Clone` so that every waiter on a failed chunk observes the same error.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TerrainError {
    /// The job generating this chunk panicked. Nothing was published.
    #[error("terrain worker panicked while generating chunk ({}, {}): {message}", coord.x, coord.z)]
    WorkerPanicked {
        /// Chunk whose generation failed.
        coord: ChunkCoord,
        /// Panic payload, if it was a string.
        message: String,
    },
    /// A bounded wait elapsed before the chunk was ready.
    #[error("timed out waiting for chunk ({}, {})", coord.x, coord.z)]
    Timeout {
        /// Chunk that was not ready in time.
        coord: ChunkCoord,
    },
    /// A worker thread could not be started.
    #[error("failed to spawn terrain worker: {0}")]
    Spawn(String),
    /// The worker pool has shut down and can no longer accept jobs.
    #[error("terrain worker pool has shut down")]
    ShutDown,
    /// The world configuration was rejected.
    #[error("invalid world configuration: {0}")]
    Config(String),
}

impl From<strata_config::ConfigError> for TerrainError {
    fn from(err: strata_config::ConfigError) -> Self {
        TerrainError::Config(err.to_string())
    }
}
