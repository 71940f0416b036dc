//! Error types for the tidepool crate.

/// Result type alias for tidepool operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by pools, executors, and task futures.
///
/// The type is `Clone` because a task's final status is cached inside its
/// future and handed out again to every listener and `status()` observer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Submit was called before the pool was initialized
    #[error("the thread pool is not initialized")]
    Uninitialized,

    /// The pool was already initialized
    #[error("the thread pool is already initialized")]
    AlreadyInitialized,

    /// Submit was called after shutdown
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The pool queue is at capacity
    #[error("thread pool queue is full ({0} items)")]
    QueueFull(usize),

    /// OS-level thread creation failed
    #[error("failed to spawn worker thread: {0}")]
    SpawnFailed(String),

    /// The task was aborted before or while it ran
    #[error("aborted: {0}")]
    Aborted(String),

    /// The task's own run method failed
    #[error("task failed: {0}")]
    TaskFailed(String),
}

impl Error {
    /// Create an unavailable error
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Error::Unavailable(msg.into())
    }

    /// Create a spawn-failure error
    pub fn spawn_failed<S: Into<String>>(msg: S) -> Self {
        Error::SpawnFailed(msg.into())
    }

    /// Create an aborted error
    pub fn aborted<S: Into<String>>(msg: S) -> Self {
        Error::Aborted(msg.into())
    }

    /// Create a task-failure error
    pub fn task_failed<S: Into<String>>(msg: S) -> Self {
        Error::TaskFailed(msg.into())
    }

    /// Whether this error is an abort marker
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::QueueFull(5).to_string(),
            "thread pool queue is full (5 items)"
        );
        assert_eq!(
            Error::aborted("task aborted before it ran").to_string(),
            "aborted: task aborted before it ran"
        );
    }

    #[test]
    fn test_is_aborted() {
        assert!(Error::aborted("x").is_aborted());
        assert!(!Error::Uninitialized.is_aborted());
    }
}
