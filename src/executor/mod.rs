//! Task execution on top of the thread pool.
//!
//! [`TaskExecutor`] wraps a [`ThreadPool`] and adds the future protocol:
//! every submission yields a [`TaskFuture`] through which the submitter can
//! wait, register listeners, or attempt a cooperative abort.

pub mod future;
pub mod task;

pub use future::{FnCallback, FutureCallback, TaskFuture, TaskState};
pub use task::{FnTask, Task};

use crate::builder::PoolBuilder;
use crate::error::Result;
use crate::pool::ThreadPool;
use std::sync::Arc;
use std::time::Instant;

/// Thin adapter submitting [`Task`]s to an owned [`ThreadPool`].
///
/// Dropping the executor drops the pool, which shuts it down.
#[derive(Debug)]
pub struct TaskExecutor {
    pool: ThreadPool,
}

impl TaskExecutor {
    /// Wrap an already built pool.
    pub fn new(pool: ThreadPool) -> Self {
        Self { pool }
    }

    /// Build an executor over a fresh pool with no permanent workers.
    pub fn create<S: Into<String>>(name: S, max_threads: usize) -> Result<Self> {
        Self::create_with_min(name, 0, max_threads)
    }

    /// Build an executor over a fresh pool with `min_threads` permanent
    /// workers.
    pub fn create_with_min<S: Into<String>>(
        name: S,
        min_threads: usize,
        max_threads: usize,
    ) -> Result<Self> {
        let pool = PoolBuilder::new(name)
            .min_threads(min_threads)
            .max_threads(max_threads)
            .build()?;
        Ok(Self::new(pool))
    }

    /// Submit a task, returning its future.
    ///
    /// On submission failure the task is not queued and the error is
    /// returned instead of a future.
    pub fn submit(&self, task: Box<dyn Task>) -> Result<Arc<TaskFuture>> {
        let future = TaskFuture::new(task);
        self.submit_future_task(&future)?;
        Ok(future)
    }

    /// Submit a bare run closure.
    pub fn submit_fn<F>(&self, run: F) -> Result<Arc<TaskFuture>>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.submit(Box::new(FnTask::new(run)))
    }

    /// Submit a run closure with a cooperative abort hook.
    pub fn submit_with_abort<F, A>(&self, run: F, abort: A) -> Result<Arc<TaskFuture>>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
        A: Fn() -> bool + Send + Sync + 'static,
    {
        self.submit(Box::new(FnTask::with_abort(run, abort)))
    }

    /// Submit a pre-constructed future task.
    ///
    /// Useful when the caller needs the handle (for listeners or an early
    /// abort) before the work is queued.
    pub fn submit_future_task(&self, future: &Arc<TaskFuture>) -> Result<()> {
        self.pool.submit(Arc::clone(future) as Arc<dyn crate::pool::WorkItem>)
    }

    /// The underlying pool.
    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }

    /// Block until the pool is quiescent.
    pub fn wait(&self) {
        self.pool.wait();
    }

    /// Block until quiescence or `deadline`; true if quiescence was observed.
    pub fn timed_wait(&self, deadline: Instant) -> bool {
        self.pool.timed_wait(deadline)
    }

    /// Shut the pool down.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}
