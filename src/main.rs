use fiberpool::{Error, FiberState, Scheduler, WorkerPool};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

fn main() -> fiberpool::Result<()> {
    println!("fiberpool - cooperative fibers and a bounded worker pool\n");

    // Example 1: Cooperative fibers on the main thread
    println!("Example 1: Fiber scheduler");
    let mut scheduler = Scheduler::new();
    let hello = scheduler.spawn(|ctx| {
        println!("  [fiber {}] hello", ctx.id());
        ctx.exit();
    })?;
    let world = scheduler.spawn(|ctx| {
        println!("  [fiber {}] yielding before printing", ctx.id());
        ctx.yield_now();
        for _ in 0..3 {
            println!("  [fiber {}] world", ctx.id());
        }
    })?;

    for id in [hello, world, world] {
        if scheduler.is_finished() {
            break;
        }
        let state = scheduler.resume(id)?;
        println!("  controller: fiber {} is now {:?}", id, state);
    }
    assert_eq!(scheduler.state(world), Some(FiberState::Terminated));
    println!("  All fibers finished: {}\n", scheduler.is_finished());

    // Example 2: Backpressure on a small pool
    println!("Example 2: Worker pool backpressure");
    let num_threads = 2;
    let pool = WorkerPool::new(num_threads, 1)?;
    println!("  Initialized pool with {} worker threads, queue capacity 1", num_threads);

    let executed = Arc::new(AtomicUsize::new(0));
    for i in 0..3 {
        let executed = executed.clone();
        match pool.submit_with(
            move |n: usize| {
                std::thread::sleep(std::time::Duration::from_millis(20));
                executed.fetch_add(1, Ordering::SeqCst);
                println!("  job {} done", n);
            },
            i,
        ) {
            Ok(()) => println!("  job {} accepted", i),
            Err(Error::Rejected { capacity }) => {
                println!("  job {} rejected (capacity {})", i, capacity)
            }
            Err(e) => return Err(e),
        }
    }

    // Example 3: Throughput with blocking submission
    println!("\nExample 3: Blocking submission throughput");
    let num_jobs = 10_000;
    let counter = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();
    for _ in 0..num_jobs {
        let counter = counter.clone();
        pool.submit_blocking(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        })?;
    }
    while counter.load(Ordering::Relaxed) < num_jobs {
        std::thread::yield_now();
    }
    let duration = start.elapsed();
    println!("  Executed {} jobs in {:?}", num_jobs, duration);
    println!(
        "  Throughput: {:.2} jobs/second\n",
        num_jobs as f64 / duration.as_secs_f64()
    );

    println!("Shutting down worker pool...");
    match pool.shutdown() {
        Ok(stats) => println!(
            "Done! accepted={} rejected={} executed={} discarded={}",
            stats.accepted, stats.rejected, stats.executed, stats.discarded
        ),
        Err(e) => eprintln!("Shutdown error: {}", e),
    }
    Ok(())
}
