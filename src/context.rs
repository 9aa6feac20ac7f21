//! Context type for control transfer from within a running fiber.

use crate::fiber::{FiberId, FiberYielder, YieldType};
use std::cell::Cell;

// Yielder of the fiber currently running on this thread, null on the controller.
thread_local! {
    static CURRENT_YIELDER: Cell<*const FiberYielder> = const { Cell::new(std::ptr::null()) };
}

pub(crate) fn current() -> *const FiberYielder {
    CURRENT_YIELDER.get()
}

pub(crate) fn set_current(yielder: &FiberYielder) {
    CURRENT_YIELDER.set(yielder as *const _);
}

pub(crate) fn restore(previous: *const FiberYielder) {
    CURRENT_YIELDER.set(previous);
}

/// Suspends the running fiber and re-registers it once control comes back.
fn suspend(yielder: &FiberYielder, reason: YieldType) {
    yielder.suspend(reason);
    set_current(yielder);
}

/// Handle given to a fiber's entry function.
///
/// It is only reachable from inside the fiber it belongs to, so `yield_now`
/// and `exit` can never be called from the controller.
pub struct FiberContext<'a> {
    id: FiberId,
    yielder: &'a FiberYielder,
}

impl<'a> FiberContext<'a> {
    pub(crate) fn new(id: FiberId, yielder: &'a FiberYielder) -> Self {
        FiberContext { id, yielder }
    }

    /// Handle of the fiber this context belongs to.
    pub fn id(&self) -> FiberId {
        self.id
    }

    /// Suspends this fiber and returns control to the controller.
    ///
    /// Execution continues right after this call on the next `resume`.
    pub fn yield_now(&self) {
        suspend(self.yielder, YieldType::Yield);
    }

    /// Terminates this fiber and returns control to the controller.
    ///
    /// The fiber is never resumed; its stack is unwound and released.
    pub fn exit(&self) -> ! {
        self.yielder.suspend(YieldType::Exit);
        unreachable!("fiber {} resumed after exit", self.id)
    }
}

/// Yields execution to allow other work to run.
///
/// If called from within a fiber, yields the fiber.
/// If called from a thread, yields the thread.
pub fn yield_now() {
    let yielder = current();
    if yielder.is_null() {
        std::thread::yield_now();
    } else {
        // SAFETY: the pointer is set by the running fiber and cleared by its
        // resumer before the fiber's stack can go away.
        suspend(unsafe { &*yielder }, YieldType::Yield);
    }
}

/// Returns true when called from inside a running fiber.
pub fn in_fiber() -> bool {
    !current().is_null()
}
