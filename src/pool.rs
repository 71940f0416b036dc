//! Elastic worker thread pool with a bounded FIFO queue.
//!
//! Workers are created on demand up to `max_threads` and, apart from the
//! first `min_threads` permanent ones, exit again after `idle_timeout` on an
//! empty queue. A single mutex guards all pool state; three condition
//! variables signal queue arrivals, quiescence, and full teardown.

use crate::builder::PoolBuilder;
use crate::error::{Error, Result};
use crate::trace::TraceContext;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// A unit of work submitted to a [`ThreadPool`].
///
/// Implementations are shared between the submitter and the queue, so `run`
/// takes `&self`; one-shot payloads keep their closure behind interior
/// mutability (see [`TaskFuture`](crate::TaskFuture) or the wrapper built by
/// [`ThreadPool::submit_fn`]).
pub trait WorkItem: Send + Sync {
    /// Execute the work. Called at most once by a pool worker.
    fn run(&self);
}

/// Anonymous work item wrapping a bare closure.
struct FnWorkItem {
    func: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl FnWorkItem {
    fn new<F: FnOnce() + Send + 'static>(f: F) -> Self {
        Self {
            func: Mutex::new(Some(Box::new(f))),
        }
    }
}

impl WorkItem for FnWorkItem {
    fn run(&self) {
        if let Some(f) = self.func.lock().take() {
            f();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolStatus {
    Uninitialized,
    Running,
    ShutDown,
}

struct QueueEntry {
    work: Arc<dyn WorkItem>,
    // Retained so the submitter can go away while the item is queued.
    trace: Option<Arc<TraceContext>>,
}

struct PoolState {
    status: PoolStatus,
    queue: VecDeque<QueueEntry>,
    // Mirrors queue.len(); kept separately so observers and the submit-time
    // capacity check read one field.
    queue_size: usize,
    num_threads: usize,
    active_threads: usize,
}

struct PoolInner {
    name: String,
    min_threads: usize,
    max_threads: usize,
    max_queue_size: usize,
    idle_timeout: Duration,
    state: Mutex<PoolState>,
    not_empty: Condvar,
    idle: Condvar,
    no_threads: Condvar,
}

/// Dynamically sized worker pool executing [`WorkItem`]s in FIFO order.
///
/// Built through [`PoolBuilder`]. Dropping the pool shuts it down: queued
/// work is discarded and the drop blocks until every worker has exited.
pub struct ThreadPool {
    inner: Arc<PoolInner>,
}

impl ThreadPool {
    pub(crate) fn new(builder: PoolBuilder) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                name: builder.name,
                min_threads: builder.min_threads,
                max_threads: builder.max_threads,
                max_queue_size: builder.max_queue_size,
                idle_timeout: builder.idle_timeout,
                state: Mutex::new(PoolState {
                    status: PoolStatus::Uninitialized,
                    queue: VecDeque::new(),
                    queue_size: 0,
                    num_threads: 0,
                    active_threads: 0,
                }),
                not_empty: Condvar::new(),
                idle: Condvar::new(),
                no_threads: Condvar::new(),
            }),
        }
    }

    /// Transition to Running and spawn the permanent workers.
    pub(crate) fn init(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.status != PoolStatus::Uninitialized {
            return Err(Error::AlreadyInitialized);
        }
        state.status = PoolStatus::Running;
        for _ in 0..self.inner.min_threads {
            if let Err(e) = self.inner.spawn_worker(&mut state) {
                drop(state);
                self.shutdown();
                return Err(e);
            }
        }
        Ok(())
    }

    /// Submit a work item to the back of the queue.
    ///
    /// Fails without enqueuing if the pool is not running or the queue is at
    /// capacity. The submitter's current [`TraceContext`] is retained by the
    /// queue entry and adopted by the worker that runs the item.
    pub fn submit(&self, work: Arc<dyn WorkItem>) -> Result<()> {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        match state.status {
            PoolStatus::Uninitialized => return Err(Error::Uninitialized),
            PoolStatus::ShutDown => {
                return Err(Error::unavailable("the pool has been shut down"))
            }
            PoolStatus::Running => {}
        }

        if state.queue_size == inner.max_queue_size {
            return Err(Error::QueueFull(state.queue_size));
        }

        // Each inactive worker is assumed to take one queued item; spawn
        // another worker when the backlog exceeds the inactive count. The
        // counts can race with a worker finishing right now, over-provisioning
        // by one; the spare exits via the idle timeout.
        let inactive = state.num_threads - state.active_threads;
        if state.queue_size + 1 > inactive && state.num_threads < inner.max_threads {
            if let Err(e) = inner.spawn_worker(&mut state) {
                if state.num_threads == 0 {
                    return Err(e);
                }
                warn!("pool {} failed to create worker thread: {}", inner.name, e);
            }
        }

        state.queue.push_back(QueueEntry {
            work,
            trace: TraceContext::current(),
        });
        state.queue_size += 1;
        inner.not_empty.notify_one();
        Ok(())
    }

    /// Submit a bare closure as an anonymous work item.
    pub fn submit_fn<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Arc::new(FnWorkItem::new(f)))
    }

    /// Block until the pool is quiescent: queue empty and no active worker.
    ///
    /// This observes an instantaneous condition and does not fence off
    /// concurrent submitters.
    pub fn wait(&self) {
        let mut state = self.inner.state.lock();
        while !(state.queue.is_empty() && state.active_threads == 0) {
            self.inner.idle.wait(&mut state);
        }
    }

    /// Like [`wait`](Self::wait), but gives up at `deadline`.
    ///
    /// Returns true if quiescence was observed before the deadline.
    pub fn timed_wait(&self, deadline: Instant) -> bool {
        let mut state = self.inner.state.lock();
        while !(state.queue.is_empty() && state.active_threads == 0) {
            if self.inner.idle.wait_until(&mut state, deadline).timed_out() {
                return state.queue.is_empty() && state.active_threads == 0;
            }
        }
        true
    }

    /// Shut the pool down: discard queued work, wake every worker, and block
    /// until all of them have exited. Idempotent.
    pub fn shutdown(&self) {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        state.status = PoolStatus::ShutDown;
        // Dropping each entry releases its retained trace reference.
        state.queue.clear();
        state.queue_size = 0;
        inner.not_empty.notify_all();
        while state.num_threads > 0 {
            inner.no_threads.wait(&mut state);
        }
    }

    /// The pool name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of live worker threads.
    pub fn num_threads(&self) -> usize {
        self.inner.state.lock().num_threads
    }

    /// Number of workers currently executing a work item.
    pub fn active_threads(&self) -> usize {
        self.inner.state.lock().active_threads
    }

    /// Current queue length.
    pub fn queue_size(&self) -> usize {
        self.inner.state.lock().queue_size
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ThreadPool")
            .field("name", &self.inner.name)
            .field("status", &state.status)
            .field("num_threads", &state.num_threads)
            .field("active_threads", &state.active_threads)
            .field("queue_size", &state.queue_size)
            .finish()
    }
}

impl PoolInner {
    /// Spawn one worker. Caller holds the state lock; the count is bumped
    /// only once the spawn succeeded.
    fn spawn_worker(self: &Arc<Self>, state: &mut PoolState) -> Result<()> {
        // The first min_threads workers are permanent and exempt from the
        // idle timeout.
        let permanent = state.num_threads < self.min_threads;
        let inner = Arc::clone(self);
        thread::Builder::new()
            .name(format!("{} [worker]", self.name))
            .spawn(move || inner.dispatch(permanent))
            .map_err(|e| Error::spawn_failed(e.to_string()))?;
        state.num_threads += 1;
        Ok(())
    }

    /// Worker main loop.
    fn dispatch(self: Arc<Self>, permanent: bool) {
        let mut state = self.state.lock();
        loop {
            if state.status != PoolStatus::Running {
                trace!("pool {} worker exiting: pool shut down", self.name);
                break;
            }

            let entry = match state.queue.pop_front() {
                Some(entry) => entry,
                None => {
                    if permanent {
                        self.not_empty.wait(&mut state);
                    } else if self.idle_wait(&mut state) {
                        debug!(
                            "pool {} worker timed out after {} ms",
                            self.name,
                            self.idle_timeout.as_millis()
                        );
                        break;
                    }
                    continue;
                }
            };
            state.queue_size -= 1;
            state.active_threads += 1;
            drop(state);

            {
                // Adopt the queue's trace reference for the duration of the
                // run; the guard drop releases it.
                let _trace = TraceContext::adopt(entry.trace);
                entry.work.run();
            }
            drop(entry.work);

            state = self.state.lock();
            state.active_threads -= 1;
            if state.active_threads == 0 {
                self.idle.notify_all();
            }
        }

        // Still holding the lock here: nobody may slip a new item in between
        // the loop exit and this decrement.
        state.num_threads -= 1;
        if state.num_threads == 0 {
            self.no_threads.notify_all();
            // The last worker out must leave nothing queued, or it would
            // never be processed.
            assert!(
                state.queue.is_empty(),
                "last worker of pool {} exited with work still queued",
                self.name
            );
        }
    }

    /// Timed wait on the not-empty condition. Returns true if the worker
    /// should exit.
    ///
    /// A timed wait can report a timeout even though a concurrent submitter
    /// notified and enqueued in the same instant, so the queue is re-checked
    /// and the wait result alone never retires a worker.
    fn idle_wait(&self, state: &mut MutexGuard<'_, PoolState>) -> bool {
        let timed_out = self
            .not_empty
            .wait_for(state, self.idle_timeout)
            .timed_out();
        timed_out && state.queue.is_empty()
    }
}
