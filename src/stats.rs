//! Pool job counters and point-in-time snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Job accounting for a worker pool.
///
/// Every submission attempt lands in exactly one of `accepted`, `rejected`
/// or `closed_rejections`; every accepted job is eventually either executed
/// or discarded at shutdown.
#[derive(Debug)]
pub struct PoolStats {
    /// Total submission attempts.
    pub submitted: AtomicU64,
    /// Jobs appended to the queue.
    pub accepted: AtomicU64,
    /// Submissions refused because the queue was full.
    pub rejected: AtomicU64,
    /// Submissions refused because the pool was closed.
    pub closed_rejections: AtomicU64,
    /// Jobs that ran to completion or panicked.
    pub executed: AtomicU64,
    /// Executed jobs that panicked.
    pub panicked: AtomicU64,
    /// Queued jobs dropped at shutdown.
    pub discarded: AtomicU64,
    /// Time when stats collection started.
    pub start_time: Instant,
}

impl PoolStats {
    pub fn new() -> Self {
        Self {
            submitted: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            closed_rejections: AtomicU64::new(0),
            executed: AtomicU64::new(0),
            panicked: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of current values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            closed_rejections: self.closed_rejections.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PoolStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of pool stats at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub closed_rejections: u64,
    pub executed: u64,
    pub panicked: u64,
    pub discarded: u64,
    pub elapsed_seconds: f64,
}

impl StatsSnapshot {
    /// Accepted jobs not yet executed or discarded (queued or in flight).
    pub fn pending(&self) -> u64 {
        self.accepted
            .saturating_sub(self.executed)
            .saturating_sub(self.discarded)
    }

    /// Calculates jobs per second throughput.
    pub fn jobs_per_second(&self) -> f64 {
        if self.elapsed_seconds > 0.0 {
            self.executed as f64 / self.elapsed_seconds
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_creation() {
        let stats = PoolStats::new();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.submitted, 0);
        assert_eq!(snapshot.executed, 0);
        assert_eq!(snapshot.pending(), 0);
        assert!(snapshot.elapsed_seconds >= 0.0);
    }

    #[test]
    fn test_pending_accounting() {
        let stats = PoolStats::new();
        stats.accepted.fetch_add(10, Ordering::Relaxed);
        stats.executed.fetch_add(6, Ordering::Relaxed);
        stats.discarded.fetch_add(1, Ordering::Relaxed);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.pending(), 3);
    }
}
