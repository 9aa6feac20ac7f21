//! Error types shared by the fiber scheduler and the worker pool.

use crate::fiber::FiberId;
use thiserror::Error;

/// Errors surfaced synchronously by scheduler and pool operations.
///
/// Neither component retries internally; the caller decides what to do.
#[derive(Debug, Error)]
pub enum Error {
    /// A fiber stack or a worker thread could not be allocated.
    #[error("failed to allocate {what}: {source}")]
    ResourceExhausted {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The fiber handle is unknown or its state forbids the operation.
    #[error("invalid fiber handle {id}: {reason}")]
    InvalidHandle { id: FiberId, reason: &'static str },

    /// The job queue is at capacity.
    #[error("job rejected: queue is full (capacity {capacity})")]
    Rejected { capacity: usize },

    /// Construction parameters are unusable.
    #[error("invalid configuration: {0}")]
    ConfigurationError(String),

    /// The pool has begun shutting down and accepts no more jobs.
    #[error("worker pool is closed")]
    PoolClosed,

    /// A fiber's entry function panicked. The fiber is terminated.
    #[error("fiber {id} panicked: {message}")]
    FiberPanicked { id: FiberId, message: String },

    /// One or more worker threads could not be joined cleanly.
    #[error("{count} worker thread(s) panicked")]
    WorkerPanicked { count: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(boxed.as_ref()), "Unknown panic");
    }

    #[test]
    fn test_error_display() {
        let err = Error::Rejected { capacity: 3 };
        assert_eq!(err.to_string(), "job rejected: queue is full (capacity 3)");

        let err = Error::InvalidHandle {
            id: FiberId(7),
            reason: "fiber has terminated",
        };
        assert_eq!(
            err.to_string(),
            "invalid fiber handle #7: fiber has terminated"
        );
    }
}
