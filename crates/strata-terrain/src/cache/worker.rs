//! Fixed pool of named worker threads fed by a crossbeam channel.
//!
//! Each worker owns one [`SampleContext`] for its whole life, so scratch
//! buffers and the erosion tile are reused from chunk to chunk.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, unbounded};
use tracing::{debug, warn};

use crate::error::TerrainError;
use crate::pipeline::SampleContext;

/// A unit of work run on a worker with that worker's context.
pub(crate) type Job = Box<dyn FnOnce(&mut SampleContext) + Send + 'static>;

/// Worker count for a configured value. `0` picks `num_cpus - 1`, at least one.
pub(crate) fn thread_count(configured: usize) -> usize {
    if configured > 0 {
        configured
    } else {
        num_cpus::get().saturating_sub(1).max(1)
    }
}

pub(crate) struct WorkerPool {
    sender: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub(crate) fn new(threads: usize) -> Result<Self, TerrainError> {
        let (sender, receiver) = unbounded::<Job>();
        let mut handles = Vec::with_capacity(threads);

        for index in 0..threads {
            let receiver = receiver.clone();
            let handle = std::thread::Builder::new()
                .name(format!("terrain-worker-{index}"))
                .spawn(move || {
                    let mut ctx = SampleContext::new();
                    while let Ok(job) = receiver.recv() {
                        // Jobs report their own panics; this keeps the worker alive.
                        if catch_unwind(AssertUnwindSafe(|| job(&mut ctx))).is_err() {
                            warn!("terrain job panicked, resetting worker context");
                            ctx = SampleContext::new();
                        }
                    }
                    debug!("terrain worker exiting");
                })
                .map_err(|err| TerrainError::Spawn(err.to_string()))?;
            handles.push(handle);
        }

        Ok(Self {
            sender: Some(sender),
            handles,
        })
    }

    pub(crate) fn submit(&self, job: Job) -> Result<(), TerrainError> {
        self.sender
            .as_ref()
            .ok_or(TerrainError::ShutDown)?
            .send(job)
            .map_err(|_| TerrainError::ShutDown)
    }

    pub(crate) fn threads(&self) -> usize {
        self.handles.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel lets workers drain queued jobs and exit.
        self.sender.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
