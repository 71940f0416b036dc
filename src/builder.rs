//! Fluent configuration for building a [`ThreadPool`].

use crate::error::Result;
use crate::pool::ThreadPool;
use std::time::Duration;

/// Builder for [`ThreadPool`].
///
/// Knobs and defaults:
///
/// - `min_threads` (0): workers spawned eagerly at init; these are permanent
///   and never reaped by the idle timeout.
/// - `max_threads` (number of CPUs): hard cap on live workers.
/// - `max_queue_size` (`usize::MAX`): submissions beyond this fail with
///   [`Error::QueueFull`](crate::Error::QueueFull).
/// - `idle_timeout` (500 ms): how long a non-permanent worker waits on an
///   empty queue before exiting.
///
/// Invalid knob values are programmer errors and panic at set time.
#[derive(Debug, Clone)]
pub struct PoolBuilder {
    pub(crate) name: String,
    pub(crate) min_threads: usize,
    pub(crate) max_threads: usize,
    pub(crate) max_queue_size: usize,
    pub(crate) idle_timeout: Duration,
}

impl PoolBuilder {
    /// Start a builder for a pool with the given name.
    ///
    /// The name labels worker threads (`"<name> [worker]"`) and diagnostics.
    pub fn new<S: Into<String>>(name: S) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "pool name must be non-empty");
        Self {
            name,
            min_threads: 0,
            max_threads: num_cpus::get(),
            max_queue_size: usize::MAX,
            idle_timeout: Duration::from_millis(500),
        }
    }

    /// Number of permanent workers spawned at init.
    pub fn min_threads(mut self, min_threads: usize) -> Self {
        self.min_threads = min_threads;
        self
    }

    /// Maximum number of live workers. Must be at least 1.
    pub fn max_threads(mut self, max_threads: usize) -> Self {
        assert!(max_threads >= 1, "max_threads must be >= 1");
        self.max_threads = max_threads;
        self
    }

    /// Maximum queue length. Must be at least 1.
    pub fn max_queue_size(mut self, max_queue_size: usize) -> Self {
        assert!(max_queue_size >= 1, "max_queue_size must be >= 1");
        self.max_queue_size = max_queue_size;
        self
    }

    /// Idle timeout after which a non-permanent worker exits.
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Construct the pool and spawn its permanent workers.
    ///
    /// Fails if any of the `min_threads` workers could not be spawned; the
    /// partially built pool is shut down before the error is returned.
    pub fn build(self) -> Result<ThreadPool> {
        assert!(
            self.min_threads <= self.max_threads,
            "min_threads must not exceed max_threads"
        );
        let pool = ThreadPool::new(self);
        pool.init()?;
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let b = PoolBuilder::new("test");
        assert_eq!(b.min_threads, 0);
        assert_eq!(b.max_threads, num_cpus::get());
        assert_eq!(b.max_queue_size, usize::MAX);
        assert_eq!(b.idle_timeout, Duration::from_millis(500));
    }

    #[test]
    #[should_panic(expected = "pool name must be non-empty")]
    fn test_empty_name_panics() {
        let _ = PoolBuilder::new("");
    }

    #[test]
    #[should_panic(expected = "max_threads must be >= 1")]
    fn test_zero_max_threads_panics() {
        let _ = PoolBuilder::new("test").max_threads(0);
    }

    #[test]
    #[should_panic(expected = "max_queue_size must be >= 1")]
    fn test_zero_queue_panics() {
        let _ = PoolBuilder::new("test").max_queue_size(0);
    }

    #[test]
    #[should_panic(expected = "min_threads must not exceed max_threads")]
    fn test_min_above_max_panics() {
        let _ = PoolBuilder::new("test")
            .min_threads(4)
            .max_threads(2)
            .build();
    }
}
