//! Scenario tests for the scheduler and the worker pool.

use crate::{Error, FiberId, FiberState, Scheduler, WorkerPool};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_yield_once_then_exit_and_run_to_completion() {
    let mut scheduler = Scheduler::new();
    let steps = Rc::new(Cell::new(0));

    let steps_a = steps.clone();
    let a = scheduler
        .spawn(move |ctx| {
            steps_a.set(steps_a.get() + 1);
            ctx.yield_now();
            steps_a.set(steps_a.get() + 10);
            ctx.exit();
        })
        .unwrap();

    let steps_b = steps.clone();
    let b = scheduler
        .spawn(move |_ctx| {
            steps_b.set(steps_b.get() + 100);
        })
        .unwrap();

    assert_eq!(scheduler.resume(a).unwrap(), FiberState::Suspended);
    assert_eq!(steps.get(), 1);
    assert!(!scheduler.is_finished());

    assert_eq!(scheduler.resume(a).unwrap(), FiberState::Terminated);
    assert_eq!(steps.get(), 11);
    assert!(!scheduler.is_finished());

    assert_eq!(scheduler.resume(b).unwrap(), FiberState::Terminated);
    assert_eq!(steps.get(), 111);
    assert!(scheduler.is_finished());
}

#[test]
fn test_resume_terminated_fiber_fails_without_corruption() {
    let mut scheduler = Scheduler::new();
    let done = scheduler.spawn(|_| {}).unwrap();
    let pending = scheduler.spawn(|ctx| ctx.yield_now()).unwrap();

    scheduler.resume(done).unwrap();
    assert!(matches!(
        scheduler.resume(done),
        Err(Error::InvalidHandle { .. })
    ));
    assert!(matches!(
        scheduler.resume(FiberId(99)),
        Err(Error::InvalidHandle { .. })
    ));

    // The other fiber is unaffected.
    assert_eq!(scheduler.state(pending), Some(FiberState::Created));
    assert_eq!(scheduler.resume(pending).unwrap(), FiberState::Suspended);
    assert_eq!(scheduler.resume(pending).unwrap(), FiberState::Terminated);
    assert!(scheduler.is_finished());
}

#[test]
fn test_counter_observes_resume_point() {
    let mut scheduler = Scheduler::new();
    let counter = Rc::new(Cell::new(0));
    let counter_clone = counter.clone();

    let id = scheduler
        .spawn(move |ctx| {
            for _ in 0..5 {
                counter_clone.set(counter_clone.get() + 1);
                ctx.yield_now();
                counter_clone.set(counter_clone.get() + 1);
            }
        })
        .unwrap();

    for round in 1..=5 {
        assert_eq!(scheduler.resume(id).unwrap(), FiberState::Suspended);
        // One increment before each yield, one after each earlier resume.
        assert_eq!(counter.get(), 2 * round - 1);
    }
    assert_eq!(scheduler.resume(id).unwrap(), FiberState::Terminated);
    assert_eq!(counter.get(), 10);
}

#[test]
fn test_free_yield_inside_fiber() {
    let mut scheduler = Scheduler::new();
    let inside = Rc::new(Cell::new(false));
    let inside_clone = inside.clone();

    let id = scheduler
        .spawn(move |_ctx| {
            inside_clone.set(crate::context::in_fiber());
            // Deep code without a context handle can still yield.
            crate::context::yield_now();
        })
        .unwrap();

    assert_eq!(scheduler.resume(id).unwrap(), FiberState::Suspended);
    assert!(inside.get());
    assert!(!crate::context::in_fiber());
    assert_eq!(scheduler.resume(id).unwrap(), FiberState::Terminated);
}

#[test]
fn test_pool_capacity_one_rejects_burst() {
    let pool = WorkerPool::new(2, 1).unwrap();
    let executed = Arc::new(AtomicUsize::new(0));

    let mut accepted = 0;
    let mut rejected = 0;
    for _ in 0..3 {
        let executed = executed.clone();
        match pool.submit(move || {
            thread::sleep(Duration::from_millis(50));
            executed.fetch_add(1, Ordering::SeqCst);
        }) {
            Ok(()) => accepted += 1,
            Err(Error::Rejected { .. }) => rejected += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(accepted + rejected, 3);
    assert!(accepted >= 1);

    let start = Instant::now();
    while executed.load(Ordering::SeqCst) < accepted {
        assert!(start.elapsed() < Duration::from_secs(5), "accepted jobs never ran");
        thread::sleep(Duration::from_millis(5));
    }

    let stats = pool.shutdown().expect("Shutdown failed");
    assert_eq!(stats.accepted, accepted as u64);
    assert_eq!(stats.rejected, rejected as u64);
    assert_eq!(stats.executed, accepted as u64);
}
