//! Single-threaded cooperative fiber scheduler.
//!
//! The scheduler is the controller context: it decides which fiber runs next
//! and regains control every time that fiber yields or terminates. Fibers
//! never switch to each other directly, and because `resume` borrows the
//! scheduler mutably, a fiber cannot reach the scheduler while it runs.
//!
//! ## Example
//!
//! ```
//! use fiberpool::{FiberState, Scheduler};
//!
//! let mut scheduler = Scheduler::new();
//! let fiber = scheduler
//!     .spawn(|ctx| {
//!         println!("before yield");
//!         ctx.yield_now();
//!         println!("after yield");
//!     })
//!     .unwrap();
//!
//! assert_eq!(scheduler.resume(fiber).unwrap(), FiberState::Suspended);
//! assert_eq!(scheduler.resume(fiber).unwrap(), FiberState::Terminated);
//! assert!(scheduler.is_finished());
//! ```

use crate::config::SchedulerConfig;
use crate::context::FiberContext;
use crate::error::{Error, Result};
use crate::fiber::{Fiber, FiberId, FiberState};

/// Owns a table of fibers and transfers control between them and itself.
pub struct Scheduler {
    config: SchedulerConfig,
    fibers: Vec<Fiber>,
}

impl Scheduler {
    /// Creates a scheduler with 128KB fiber stacks.
    pub fn new() -> Self {
        Scheduler {
            config: SchedulerConfig::default(),
            fibers: Vec::new(),
        }
    }

    /// Creates a scheduler with custom configuration.
    pub fn with_config(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Scheduler {
            config,
            fibers: Vec::new(),
        })
    }

    /// Creates a fiber that will run `entry(ctx, arg)` on its own stack.
    ///
    /// The fiber does not start until it is first resumed. `arg` is moved
    /// into the fiber.
    pub fn create<F, A>(&mut self, entry: F, arg: A) -> Result<FiberId>
    where
        F: FnOnce(&FiberContext<'_>, A) + 'static,
        A: 'static,
    {
        let id = FiberId(self.fibers.len());
        let fiber = Fiber::new(id, self.config.stack_size, entry, arg)?;
        self.fibers.push(fiber);
        tracing::trace!(fiber = %id, stack_size = self.config.stack_size, "fiber created");
        Ok(id)
    }

    /// Creates a fiber from a closure that takes no separate argument.
    pub fn spawn<F>(&mut self, f: F) -> Result<FiberId>
    where
        F: FnOnce(&FiberContext<'_>) + 'static,
    {
        self.create(move |ctx, ()| f(ctx), ())
    }

    /// Transfers control to the fiber until it yields or terminates.
    ///
    /// Fails with `InvalidHandle` if the fiber is unknown, running or
    /// terminated, and with `FiberPanicked` if its entry function panicked.
    pub fn resume(&mut self, id: FiberId) -> Result<FiberState> {
        let fiber = self.fibers.get_mut(id.0).ok_or(Error::InvalidHandle {
            id,
            reason: "no such fiber",
        })?;
        fiber.resume()
    }

    /// True iff every created fiber has terminated.
    pub fn is_finished(&self) -> bool {
        self.fibers.iter().all(Fiber::is_terminated)
    }

    /// Round-robin controller loop: resumes every live fiber in handle order
    /// until all have terminated. Returns the number of resumes performed.
    ///
    /// A fiber that panics stops the loop; the remaining fibers stay suspended
    /// and can still be resumed.
    pub fn run(&mut self) -> Result<usize> {
        let mut resumes = 0;
        while !self.is_finished() {
            for fiber in self.fibers.iter_mut().filter(|f| !f.is_terminated()) {
                fiber.resume()?;
                resumes += 1;
            }
        }
        Ok(resumes)
    }

    /// Returns the state of a fiber, or `None` for an unknown handle.
    pub fn state(&self, id: FiberId) -> Option<FiberState> {
        self.fibers.get(id.0).map(Fiber::state)
    }

    /// Number of fibers ever created.
    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }

    /// Number of fibers that have not terminated yet.
    pub fn live_count(&self) -> usize {
        self.fibers.iter().filter(|f| !f.is_terminated()).count()
    }

    pub fn stack_size(&self) -> usize {
        self.config.stack_size
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Scheduler::new()
    }
}
