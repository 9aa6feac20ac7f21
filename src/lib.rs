//! # fiberpool - Two Ways to Run Many Tasks on Few Resources
//!
//! This crate provides two independent concurrency primitives built from
//! scratch:
//!
//! - **[`Scheduler`]**: a single-threaded cooperative scheduler that
//!   multiplexes stackful fibers onto the calling OS thread. Control moves
//!   only at explicit `yield_now`/`exit` points, always through the
//!   controller, so no locking is involved.
//! - **[`WorkerPool`]**: a fixed set of OS threads draining a bounded FIFO
//!   job queue guarded by a mutex and condition variable. A full queue
//!   rejects new jobs instead of growing.
//!
//! The two components share no state and never call each other.
//!
//! ## Example
//!
//! ```
//! use fiberpool::{Scheduler, WorkerPool};
//!
//! let mut scheduler = Scheduler::new();
//! scheduler.spawn(|ctx| {
//!     ctx.yield_now();
//! }).unwrap();
//! scheduler.run().unwrap();
//! assert!(scheduler.is_finished());
//!
//! let pool = WorkerPool::new(2, 4).unwrap();
//! pool.submit(|| println!("Hello from a worker!")).unwrap();
//! pool.shutdown().unwrap();
//! ```

pub mod config;
pub mod context;
pub mod error;
mod fiber;
pub mod job;
pub mod pool;
mod queue;
pub mod scheduler;
mod stats;
mod worker;

pub use config::{PinningStrategy, PoolConfig, SchedulerConfig, ShutdownPolicy};
pub use context::FiberContext;
pub use error::{Error, Result};
pub use fiber::{FiberId, FiberState};
pub use job::Job;
pub use pool::{Submitter, WorkerPool};
pub use scheduler::Scheduler;
pub use stats::StatsSnapshot;

#[cfg(test)]
mod tests;
