//! tidepool - elastic worker pool with task futures
//!
//! A worker thread pool for pushing short-to-medium CPU/IO work off the
//! caller's thread, paired with a future/listener protocol for observing
//! completion, failure, or abortion.
//!
//! # Quick Start
//!
//! ```no_run
//! use tidepool::{PoolBuilder, TaskExecutor};
//!
//! // A pool that scales between 0 and 4 workers.
//! let pool = PoolBuilder::new("maintenance")
//!     .max_threads(4)
//!     .build()
//!     .unwrap();
//! pool.submit_fn(|| println!("on a worker")).unwrap();
//! pool.wait();
//!
//! // Or go through the executor to get futures back.
//! let executor = TaskExecutor::create("bootstrap", 4).unwrap();
//! let future = executor.submit_fn(|| Ok(())).unwrap();
//! future.wait();
//! assert_eq!(future.status(), Some(Ok(())));
//! ```
//!
//! # Features
//!
//! - **Elastic sizing**: workers are created on demand between
//!   `min_threads` and `max_threads`; idle non-permanent workers reap
//!   themselves after a timeout.
//! - **Bounded queue**: submissions beyond `max_queue_size` fail fast with
//!   a queue-full error, surfacing backpressure to the submitter.
//! - **Task futures**: wait, register completion listeners, or abort
//!   cooperatively through [`TaskFuture`].
//! - **Quiescence**: [`ThreadPool::wait`] blocks until the queue is empty
//!   and no worker is active.
//! - **Trace propagation**: a submitter's [`TraceContext`] rides along with
//!   the queued item and is adopted by the executing worker.

// Lint configuration
#![warn(missing_docs, missing_debug_implementations)]

pub mod builder;
pub mod error;
pub mod executor;
pub mod pool;
pub mod trace;
pub mod util;

// Re-export key types at crate root
pub use builder::PoolBuilder;
pub use error::{Error, Result};
pub use executor::{
    FnCallback, FnTask, FutureCallback, Task, TaskExecutor, TaskFuture, TaskState,
};
pub use pool::{ThreadPool, WorkItem};
pub use trace::TraceContext;

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_pool_smoke() {
        let pool = PoolBuilder::new("smoke").max_threads(2).build().unwrap();

        let hits = Arc::new(Mutex::new(0));
        for _ in 0..10 {
            let hits = hits.clone();
            pool.submit_fn(move || {
                *hits.lock() += 1;
            })
            .unwrap();
        }
        pool.wait();

        assert_eq!(*hits.lock(), 10);
        pool.shutdown();
    }

    #[test]
    fn test_executor_smoke() {
        let executor = TaskExecutor::create("smoke-exec", 2).unwrap();
        let future = executor.submit_fn(|| Ok(())).unwrap();
        future.wait();
        assert_eq!(future.status(), Some(Ok(())));
    }
}
