//! Construction-time configuration for the scheduler and the worker pool.
//!
//! Both config types deserialize with defaults for missing fields, so a
//! partial JSON or TOML document is enough to override a single option.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default per-fiber stack size: 128 KiB.
pub const DEFAULT_STACK_SIZE: usize = 128 * 1024;

/// Largest accepted per-fiber stack size. Leaves headroom for the guard page
/// and page rounding the stack allocator adds on top.
pub const MAX_STACK_SIZE: usize = isize::MAX as usize / 2;

/// Default bound on pending jobs.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Strategy for pinning worker threads to CPU cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PinningStrategy {
    /// No pinning (standard OS scheduling).
    #[default]
    None,
    /// Linear pinning (worker i -> logical processor i).
    Linear,
    /// Pin to physical cores only (even-numbered logical processors), avoiding SMT contention.
    AvoidSMT,
}

impl PinningStrategy {
    /// Returns the core a worker should be pinned to, if any.
    pub(crate) fn core_for(self, worker_id: usize) -> Option<core_affinity::CoreId> {
        let index = match self {
            PinningStrategy::None => return None,
            PinningStrategy::Linear => worker_id,
            PinningStrategy::AvoidSMT => worker_id * 2,
        };
        core_affinity::get_core_ids()?.get(index).copied()
    }
}

/// What happens to jobs still queued when the pool shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShutdownPolicy {
    /// Queued jobs are dropped without running.
    #[default]
    Discard,
    /// Workers keep dequeuing until the queue is empty, then exit.
    Drain,
}

/// Configuration for the fiber scheduler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Stack size for each fiber in bytes. Default: 128KB.
    pub stack_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl SchedulerConfig {
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.stack_size == 0 {
            return Err(Error::ConfigurationError(
                "fiber stack size must be positive".into(),
            ));
        }
        if self.stack_size > MAX_STACK_SIZE {
            return Err(Error::ConfigurationError(format!(
                "fiber stack size {} exceeds the maximum of {MAX_STACK_SIZE} bytes",
                self.stack_size
            )));
        }
        Ok(())
    }
}

/// Configuration for the worker pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads. Default: available parallelism.
    pub workers: usize,
    /// Maximum number of pending jobs before submissions are rejected.
    pub queue_capacity: usize,
    pub pinning: PinningStrategy,
    pub shutdown: ShutdownPolicy,
    /// Worker threads are named `{thread_name}-{id}`.
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            workers,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            pinning: PinningStrategy::None,
            shutdown: ShutdownPolicy::Discard,
            thread_name: "fiberpool-worker".to_string(),
        }
    }
}

impl PoolConfig {
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        Self {
            workers,
            queue_capacity,
            ..Self::default()
        }
    }

    pub fn with_pinning(mut self, pinning: PinningStrategy) -> Self {
        self.pinning = pinning;
        self
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownPolicy) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::ConfigurationError(
                "worker count must be positive".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(Error::ConfigurationError(
                "queue capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SchedulerConfig::default().validate().is_ok());
        let pool = PoolConfig::default();
        assert!(pool.workers >= 1);
        assert_eq!(pool.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert!(pool.validate().is_ok());
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(matches!(
            PoolConfig::new(0, 4).validate(),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            PoolConfig::new(4, 0).validate(),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            SchedulerConfig::default().with_stack_size(0).validate(),
            Err(Error::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_oversized_stack_rejected() {
        for size in [usize::MAX, isize::MAX as usize, MAX_STACK_SIZE + 1] {
            assert!(matches!(
                SchedulerConfig::default().with_stack_size(size).validate(),
                Err(Error::ConfigurationError(_))
            ));
        }
        assert!(
            SchedulerConfig::default()
                .with_stack_size(MAX_STACK_SIZE)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: PoolConfig =
            serde_json::from_str(r#"{ "workers": 3, "shutdown": "Drain" }"#).unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.shutdown, ShutdownPolicy::Drain);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.pinning, PinningStrategy::None);

        let config: SchedulerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.stack_size, DEFAULT_STACK_SIZE);
    }

    #[test]
    fn test_no_pinning_yields_no_core() {
        assert!(PinningStrategy::None.core_for(0).is_none());
    }
}
