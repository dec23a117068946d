//! A chunk result that becomes available later.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::chunk::{ChunkCoord, ChunkTerrainData};
use crate::error::TerrainError;

enum State {
    Pending,
    Ready(Arc<ChunkTerrainData>),
    Failed(TerrainError),
}

struct Slot {
    state: Mutex<State>,
    ready: Condvar,
}

/// Handle to one chunk's generation. Clones share the same result.
#[derive(Clone)]
pub struct TerrainFuture {
    coord: ChunkCoord,
    slot: Arc<Slot>,
}

impl TerrainFuture {
    pub(crate) fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            slot: Arc::new(Slot {
                state: Mutex::new(State::Pending),
                ready: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.slot
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish the result and wake every waiter. Only the first call has an effect.
    pub(crate) fn complete(&self, result: Result<Arc<ChunkTerrainData>, TerrainError>) {
        let mut state = self.lock();
        if matches!(*state, State::Pending) {
            *state = match result {
                Ok(data) => State::Ready(data),
                Err(err) => State::Failed(err),
            };
            self.slot.ready.notify_all();
        }
    }

    /// The chunk being generated.
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Whether a result (success or failure) has been published.
    pub fn is_complete(&self) -> bool {
        !matches!(*self.lock(), State::Pending)
    }

    /// The result, if published, without blocking.
    pub fn try_get(&self) -> Option<Result<Arc<ChunkTerrainData>, TerrainError>> {
        match &*self.lock() {
            State::Pending => None,
            State::Ready(data) => Some(Ok(Arc::clone(data))),
            State::Failed(err) => Some(Err(err.clone())),
        }
    }

    /// Block until the result is published.
    pub fn join(&self) -> Result<Arc<ChunkTerrainData>, TerrainError> {
        let mut state = self.lock();
        loop {
            match &*state {
                State::Ready(data) => return Ok(Arc::clone(data)),
                State::Failed(err) => return Err(err.clone()),
                State::Pending => {}
            }
            state = self
                .slot
                .ready
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Block for at most `timeout`.
    pub fn join_timeout(&self, timeout: Duration) -> Result<Arc<ChunkTerrainData>, TerrainError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            match &*state {
                State::Ready(data) => return Ok(Arc::clone(data)),
                State::Failed(err) => return Err(err.clone()),
                State::Pending => {}
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(TerrainError::Timeout { coord: self.coord });
            }
            state = self
                .slot
                .ready
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .0;
        }
    }

    /// Whether two handles refer to the same generation.
    pub fn same_as(&self, other: &TerrainFuture) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    /// The ready result if this is the last handle, consuming it.
    pub(crate) fn into_unique_data(self) -> Option<Arc<ChunkTerrainData>> {
        let slot = Arc::try_unwrap(self.slot).ok()?;
        match slot
            .state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
        {
            State::Ready(data) => Some(data),
            State::Pending | State::Failed(_) => None,
        }
    }
}

impl std::fmt::Debug for TerrainFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerrainFuture")
            .field("coord", &self.coord)
            .field("complete", &self.is_complete())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_join_wakes_all_waiters() {
        let future = TerrainFuture::new(ChunkCoord::new(0, 0));
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let f = future.clone();
                thread::spawn(move || f.join())
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        let data = Arc::new(ChunkTerrainData::new());
        future.complete(Ok(Arc::clone(&data)));
        for w in waiters {
            let got = w.join().unwrap().unwrap();
            assert!(Arc::ptr_eq(&got, &data));
        }
    }

    #[test]
    fn test_failure_seen_by_every_waiter() {
        let coord = ChunkCoord::new(2, 2);
        let future = TerrainFuture::new(coord);
        let err = TerrainError::WorkerPanicked {
            coord,
            message: "bad".to_string(),
        };
        future.complete(Err(err.clone()));
        assert_eq!(future.join().unwrap_err(), err);
        assert_eq!(future.clone().join().unwrap_err(), err);
    }

    #[test]
    fn test_first_completion_wins() {
        let future = TerrainFuture::new(ChunkCoord::new(0, 0));
        future.complete(Err(TerrainError::ShutDown));
        future.complete(Ok(Arc::new(ChunkTerrainData::new())));
        assert_eq!(future.join().unwrap_err(), TerrainError::ShutDown);
    }

    #[test]
    fn test_join_timeout_elapses() {
        let coord = ChunkCoord::new(9, 9);
        let future = TerrainFuture::new(coord);
        assert_eq!(
            future.join_timeout(Duration::from_millis(10)).unwrap_err(),
            TerrainError::Timeout { coord }
        );
        assert!(future.try_get().is_none());
    }

    #[test]
    fn test_unique_data_only_from_last_handle() {
        let future = TerrainFuture::new(ChunkCoord::new(0, 0));
        future.complete(Ok(Arc::new(ChunkTerrainData::new())));
        let other = future.clone();
        assert!(future.into_unique_data().is_none());
        assert!(other.into_unique_data().is_some());
    }
}
