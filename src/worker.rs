//! Worker thread implementation.
//!
//! Worker threads pull jobs from the pool's shared queue and execute them
//! outside the lock. An idle worker sleeps on the pool's condition variable
//! until a job arrives or termination is requested.

use crate::error::{Error, Result};
use crate::job::JobOutcome;
use crate::pool::Shared;
use crate::stats::PoolStats;
use crossbeam::utils::CachePadded;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// Flags a worker shares with the pool.
#[derive(Debug, Default)]
pub struct WorkerStatus {
    /// Set once by the pool, never reset.
    terminate: AtomicBool,
    /// Written by the worker around every job, read by the pool.
    busy: CachePadded<AtomicBool>,
}

impl WorkerStatus {
    pub(crate) fn request_termination(&self) {
        self.terminate.store(true, Ordering::Release);
    }

    pub fn termination_requested(&self) -> bool {
        self.terminate.load(Ordering::Acquire)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Relaxed)
    }

    fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::Relaxed);
    }
}

/// A worker thread that executes jobs from the pool's queue.
pub struct Worker {
    id: usize,
    status: Arc<WorkerStatus>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns a named worker thread, optionally pinned to a core.
    pub(crate) fn spawn(
        id: usize,
        name: String,
        shared: Arc<Shared>,
        core: Option<core_affinity::CoreId>,
    ) -> Result<Self> {
        let status = Arc::new(WorkerStatus::default());
        let thread_status = Arc::clone(&status);

        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || {
                // Pin worker to its core for better cache locality
                if let Some(core) = core
                    && !core_affinity::set_for_current(core)
                {
                    tracing::warn!(worker = id, core = core.id, "failed to pin worker");
                }

                Worker::run_loop(id, &shared, &thread_status);
            })
            .map_err(|source| Error::ResourceExhausted {
                what: "worker thread",
                source,
            })?;

        tracing::debug!(worker = id, "worker spawned");
        Ok(Worker {
            id,
            status,
            handle: Some(handle),
        })
    }

    /// Main execution loop for the worker thread.
    ///
    /// Exits once termination was requested and the queue is empty.
    fn run_loop(id: usize, shared: &Shared, status: &WorkerStatus) {
        loop {
            let job = {
                let state = shared.lock();
                let mut state = shared
                    .job_ready
                    .wait_while(state, |s| {
                        s.queue.is_empty() && !status.termination_requested()
                    })
                    .unwrap_or_else(PoisonError::into_inner);

                match state.queue.pop() {
                    Some(job) => job,
                    None => break,
                }
            };
            shared.slot_free.notify_one();

            status.set_busy(true);
            let outcome = job.execute();
            status.set_busy(false);

            PoolStats::bump(&shared.stats.executed);
            if let JobOutcome::Panicked(message) = outcome {
                PoolStats::bump(&shared.stats.panicked);
                tracing::error!(worker = id, %message, "job panicked");
            }
        }

        tracing::debug!(worker = id, "worker exiting");
    }

    /// Returns the worker's ID.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn status(&self) -> &WorkerStatus {
        &self.status
    }

    /// True when this worker's thread is the calling thread.
    pub(crate) fn is_current_thread(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|h| h.thread().id() == thread::current().id())
    }

    /// Waits for the worker thread to finish.
    pub fn join(mut self) -> thread::Result<()> {
        if let Some(handle) = self.handle.take() {
            handle.join()
        } else {
            Ok(())
        }
    }
}
