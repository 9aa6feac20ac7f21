//! Job definitions and execution logic.
//!
//! Jobs are fire-and-forget units of work executed by the worker pool. A job
//! owns everything it needs: its payload is moved in at submission time, so
//! the producer's memory never has to outlive the call to `submit`.

use crate::error::panic_message;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Result of running a job on a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// The job panicked; the panic was contained and carries its message.
    Panicked(String),
}

/// A unit of work to be executed by the worker pool.
pub struct Job {
    work: Box<dyn FnOnce() + Send + 'static>,
}

impl Job {
    /// Creates a new job with the given work function.
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Job {
            work: Box::new(work),
        }
    }

    /// Creates a job that calls `func(payload)`, taking ownership of `payload`.
    pub fn with_payload<F, P>(func: F, payload: P) -> Self
    where
        F: FnOnce(P) + Send + 'static,
        P: Send + 'static,
    {
        Job::new(move || func(payload))
    }

    /// Executes the job, containing any panic it raises.
    pub fn execute(self) -> JobOutcome {
        match catch_unwind(AssertUnwindSafe(self.work)) {
            Ok(()) => JobOutcome::Completed,
            Err(payload) => JobOutcome::Panicked(panic_message(payload.as_ref())),
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job").finish_non_exhaustive()
    }
}
