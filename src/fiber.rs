//! Fiber management and execution context.
//!
//! A fiber is a stackful coroutine with its own private stack. It runs until
//! it explicitly yields or exits, at which point control returns to whoever
//! resumed it.

use crate::context::{self, FiberContext};
use crate::error::{Error, Result, panic_message};
use corosensei::stack::DefaultStack;
use corosensei::{Coroutine, CoroutineResult, Yielder};
use std::fmt;

/// Stable handle to a fiber owned by a [`Scheduler`](crate::Scheduler).
///
/// Handles are indices into the scheduler's fiber table and are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FiberId(pub usize);

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a fiber.
///
/// `Created -> Running -> (Suspended -> Running)* -> Terminated`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FiberState {
    /// Stack allocated, execution not yet started.
    Created,
    /// Parked at a yield point.
    Suspended,
    /// Currently executing. At most one fiber per scheduler.
    Running,
    /// Entry function returned, exited or panicked. Never resumed again.
    Terminated,
}

/// Why a fiber handed control back to its resumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum YieldType {
    /// Cooperative yield; the fiber expects to be resumed later.
    Yield,
    /// The fiber is done and its stack may be reclaimed.
    Exit,
}

pub(crate) type FiberYielder = Yielder<(), YieldType>;
type FiberCoroutine = Coroutine<(), YieldType, (), DefaultStack>;
type Entry = Box<dyn FnOnce(&FiberYielder)>;

enum Body {
    /// Stack reserved and entry captured; the coroutine is built on first resume.
    Unstarted { stack: DefaultStack, entry: Entry },
    Started(FiberCoroutine),
    /// Stack released.
    Finished,
}

/// Represents a fiber - a lightweight stackful execution context.
///
/// Uses `corosensei` for context switching. The stack is exclusively owned by
/// the fiber and released as soon as the fiber terminates.
pub struct Fiber {
    id: FiberId,
    state: FiberState,
    body: Body,
}

impl Fiber {
    /// Allocates the fiber's stack and captures its entry point. Nothing runs yet.
    pub(crate) fn new<F, A>(id: FiberId, stack_size: usize, entry: F, arg: A) -> Result<Self>
    where
        F: FnOnce(&FiberContext<'_>, A) + 'static,
        A: 'static,
    {
        let stack = DefaultStack::new(stack_size).map_err(|source| Error::ResourceExhausted {
            what: "fiber stack",
            source,
        })?;

        let entry: Entry = Box::new(move |yielder: &FiberYielder| {
            let ctx = FiberContext::new(id, yielder);
            entry(&ctx, arg);
        });

        Ok(Fiber {
            id,
            state: FiberState::Created,
            body: Body::Unstarted { stack, entry },
        })
    }

    pub fn state(&self) -> FiberState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == FiberState::Terminated
    }

    /// Switches into the fiber and runs it until it yields, exits or returns.
    ///
    /// Returns the state the fiber was left in: `Suspended` or `Terminated`.
    pub(crate) fn resume(&mut self) -> Result<FiberState> {
        match self.state {
            FiberState::Created | FiberState::Suspended => {}
            FiberState::Running => {
                return Err(Error::InvalidHandle {
                    id: self.id,
                    reason: "fiber is already running",
                });
            }
            FiberState::Terminated => {
                return Err(Error::InvalidHandle {
                    id: self.id,
                    reason: "fiber has terminated",
                });
            }
        }

        // Lazily build the coroutine atop the reserved stack.
        if matches!(self.body, Body::Unstarted { .. }) {
            if let Body::Unstarted { stack, entry } =
                std::mem::replace(&mut self.body, Body::Finished)
            {
                self.body = Body::Started(Coroutine::with_stack(
                    stack,
                    move |yielder: &FiberYielder, ()| {
                        context::set_current(yielder);
                        entry(yielder);
                    },
                ));
            }
        }

        let Body::Started(coroutine) = &mut self.body else {
            return Err(Error::InvalidHandle {
                id: self.id,
                reason: "fiber has no execution context",
            });
        };

        self.state = FiberState::Running;
        let previous = context::current();
        let result =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| coroutine.resume(())));
        context::restore(previous);

        match result {
            Ok(CoroutineResult::Yield(YieldType::Yield)) => {
                self.state = FiberState::Suspended;
                Ok(FiberState::Suspended)
            }
            Ok(CoroutineResult::Yield(YieldType::Exit)) | Ok(CoroutineResult::Return(())) => {
                self.terminate();
                Ok(FiberState::Terminated)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(fiber = %self.id, %message, "fiber panicked");
                self.terminate();
                Err(Error::FiberPanicked {
                    id: self.id,
                    message,
                })
            }
        }
    }

    /// Marks the fiber terminated and releases its stack.
    ///
    /// Dropping a coroutine that is still suspended (after `exit`) unwinds its
    /// stack, so values owned by the fiber are dropped here.
    fn terminate(&mut self) {
        self.state = FiberState::Terminated;
        self.body = Body::Finished;
        tracing::trace!(fiber = %self.id, "fiber terminated");
    }
}

impl fmt::Debug for Fiber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish()
    }
}
