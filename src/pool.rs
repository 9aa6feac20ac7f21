//! Fixed-size worker thread pool with a bounded job queue.
//!
//! Producers append jobs to a FIFO mailbox under a single mutex; idle workers
//! sleep on a condition variable built on that mutex. When the mailbox is full
//! `submit` fails immediately with [`Error::Rejected`] and the caller picks
//! the retry policy, or calls [`WorkerPool::submit_blocking`] to wait for room.
//!
//! ## Example
//!
//! ```
//! use fiberpool::WorkerPool;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let pool = WorkerPool::new(2, 16).unwrap();
//! let hits = Arc::new(AtomicUsize::new(0));
//!
//! for _ in 0..4 {
//!     let hits = hits.clone();
//!     pool.submit_blocking(move || {
//!         hits.fetch_add(1, Ordering::SeqCst);
//!     })
//!     .unwrap();
//! }
//!
//! let stats = pool.shutdown().unwrap();
//! assert_eq!(stats.accepted, 4);
//! ```

use crate::config::{PoolConfig, ShutdownPolicy};
use crate::error::{Error, Result};
use crate::job::Job;
use crate::queue::BoundedQueue;
use crate::stats::{PoolStats, StatsSnapshot};
use crate::worker::Worker;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

pub(crate) struct PoolState {
    pub(crate) queue: BoundedQueue<Job>,
    /// Set once shutdown begins; no job is accepted afterwards.
    pub(crate) closed: bool,
}

/// State shared between the pool, its workers and its submitters.
pub(crate) struct Shared {
    state: Mutex<PoolState>,
    /// Signalled when a job is queued, broadcast on shutdown.
    pub(crate) job_ready: Condvar,
    /// Signalled when a worker dequeues a job, broadcast on shutdown.
    pub(crate) slot_free: Condvar,
    pub(crate) stats: PoolStats,
}

impl Shared {
    fn new(capacity: usize) -> Self {
        Shared {
            state: Mutex::new(PoolState {
                queue: BoundedQueue::new(capacity),
                closed: false,
            }),
            job_ready: Condvar::new(),
            slot_free: Condvar::new(),
            stats: PoolStats::new(),
        }
    }

    /// Jobs never run under the lock, so a poisoned mutex still guards a
    /// consistent queue.
    pub(crate) fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn submit(&self, job: Job) -> Result<()> {
        PoolStats::bump(&self.stats.submitted);
        let mut state = self.lock();
        self.enqueue(&mut state, job)
    }

    fn submit_blocking(&self, job: Job) -> Result<()> {
        PoolStats::bump(&self.stats.submitted);
        let state = self.lock();
        let mut state = self
            .slot_free
            .wait_while(state, |s| s.queue.is_full() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        self.enqueue(&mut state, job)
    }

    fn enqueue(&self, state: &mut PoolState, job: Job) -> Result<()> {
        if state.closed {
            PoolStats::bump(&self.stats.closed_rejections);
            return Err(Error::PoolClosed);
        }

        match state.queue.push(job) {
            Ok(()) => {
                PoolStats::bump(&self.stats.accepted);
                self.job_ready.notify_one();
                Ok(())
            }
            Err(_job) => {
                PoolStats::bump(&self.stats.rejected);
                let capacity = state.queue.capacity();
                tracing::debug!(capacity, "queue full, job rejected");
                Err(Error::Rejected { capacity })
            }
        }
    }
}

/// A pool of worker threads fed by a bounded FIFO queue.
pub struct WorkerPool {
    workers: Vec<Worker>,
    shared: Arc<Shared>,
    policy: ShutdownPolicy,
}

impl WorkerPool {
    /// Creates a pool with `workers` threads and room for `queue_capacity`
    /// pending jobs.
    pub fn new(workers: usize, queue_capacity: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(workers, queue_capacity))
    }

    /// Creates a pool from a full configuration.
    ///
    /// If a worker thread cannot be spawned, the workers already started are
    /// shut down before the error is returned.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let mut pool = WorkerPool {
            workers: Vec::with_capacity(config.workers),
            shared: Arc::new(Shared::new(config.queue_capacity)),
            policy: config.shutdown,
        };

        for id in 0..config.workers {
            let worker = Worker::spawn(
                id,
                format!("{}-{}", config.thread_name, id),
                Arc::clone(&pool.shared),
                config.pinning.core_for(id),
            )
            .inspect_err(|err| {
                tracing::error!(worker = id, error = %err, "failed to spawn worker")
            })?;
            pool.workers.push(worker);
        }

        tracing::debug!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "worker pool started"
        );
        Ok(pool)
    }

    /// Queues a job without blocking.
    ///
    /// Fails with `Rejected` when the queue is full and `PoolClosed` after
    /// shutdown began.
    pub fn submit<F>(&self, work: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.submit(Job::new(work))
    }

    /// Queues `func(payload)`; the payload is moved into the job now.
    pub fn submit_with<F, P>(&self, func: F, payload: P) -> Result<()>
    where
        F: FnOnce(P) + Send + 'static,
        P: Send + 'static,
    {
        self.shared.submit(Job::with_payload(func, payload))
    }

    /// Queues a prepared job without blocking.
    pub fn submit_job(&self, job: Job) -> Result<()> {
        self.shared.submit(job)
    }

    /// Queues a job, waiting for a free slot if the queue is full.
    pub fn submit_blocking<F>(&self, work: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.submit_blocking(Job::new(work))
    }

    /// Returns a cloneable handle producers on other threads can submit through.
    pub fn submitter(&self) -> Submitter {
        Submitter {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Returns the number of worker threads in the pool.
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Returns the number of workers currently executing a job.
    pub fn busy_workers(&self) -> usize {
        self.workers.iter().filter(|w| w.status().is_busy()).count()
    }

    pub fn idle_workers(&self) -> usize {
        self.num_workers() - self.busy_workers()
    }

    /// Number of jobs waiting in the queue.
    pub fn queued(&self) -> usize {
        self.shared.lock().queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.lock().queue.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Shuts down the pool and waits for every worker thread to exit.
    ///
    /// Queued jobs are discarded or drained according to the configured
    /// [`ShutdownPolicy`]. Returns the final stats, or `WorkerPanicked` if
    /// any worker thread could not be joined cleanly.
    pub fn shutdown(mut self) -> Result<StatsSnapshot> {
        let failed = self.stop();
        if failed > 0 {
            Err(Error::WorkerPanicked { count: failed })
        } else {
            Ok(self.stats())
        }
    }

    /// Closes the queue, signals every worker and joins them. Idempotent.
    fn stop(&mut self) -> usize {
        let discarded = {
            let mut state = self.shared.lock();
            state.closed = true;

            let discarded: Vec<Job> = match self.policy {
                ShutdownPolicy::Discard => state.queue.drain().collect(),
                ShutdownPolicy::Drain => Vec::new(),
            };

            for worker in &self.workers {
                worker.status().request_termination();
            }
            self.shared.job_ready.notify_all();
            self.shared.slot_free.notify_all();
            discarded
        };

        // Dropped outside the lock: a job's captures may touch the pool.
        if !discarded.is_empty() {
            let count = discarded.len();
            self.shared
                .stats
                .discarded
                .fetch_add(count as u64, std::sync::atomic::Ordering::Relaxed);
            tracing::warn!(count, "discarding queued jobs at shutdown");
            drop(discarded);
        }

        let mut failed_count = 0;
        for worker in self.workers.drain(..) {
            let worker_id = worker.id();
            if worker.is_current_thread() {
                // Joining ourselves would deadlock; the loop exits after this job.
                tracing::warn!(worker = worker_id, "pool dropped from its own worker, detaching");
                continue;
            }
            if worker.join().is_err() {
                failed_count += 1;
                tracing::error!(worker = worker_id, "worker panicked during execution");
            }
        }
        failed_count
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Cloneable producer handle for a [`WorkerPool`].
///
/// Submissions through a handle that outlives its pool fail with `PoolClosed`.
#[derive(Clone)]
pub struct Submitter {
    shared: Arc<Shared>,
}

impl Submitter {
    pub fn submit<F>(&self, work: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.submit(Job::new(work))
    }

    pub fn submit_with<F, P>(&self, func: F, payload: P) -> Result<()>
    where
        F: FnOnce(P) + Send + 'static,
        P: Send + 'static,
    {
        self.shared.submit(Job::with_payload(func, payload))
    }

    pub fn submit_blocking<F>(&self, work: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.submit_blocking(Job::new(work))
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}
