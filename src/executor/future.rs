//! Observable handles for submitted tasks.

use crate::error::{Error, Result};
use crate::executor::task::Task;
use crate::pool::WorkItem;
use crate::util::CountdownLatch;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

const ABORTED_BEFORE_RUN: &str = "task aborted before it ran";

/// Lifecycle of a task future.
///
/// `Aborted` is terminal: once entered, no later transition is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Queued, not yet picked up by a worker
    Pending,
    /// Executing on a worker
    Running,
    /// Run returned; the status is cached
    Finished,
    /// A cooperative abort succeeded
    Aborted,
}

/// Completion callback registered against a [`TaskFuture`].
///
/// Callbacks run inline on the worker thread that completes the task (or on
/// the registering thread when the future is already terminal), so they must
/// be short and non-blocking.
pub trait FutureCallback: Send + Sync {
    /// The task finished with an ok status.
    fn on_success(&self);

    /// The task failed or was aborted.
    fn on_failure(&self, error: &Error);
}

/// Adapts a pair of closures into a [`FutureCallback`].
pub struct FnCallback {
    on_success: Box<dyn Fn() + Send + Sync>,
    on_failure: Box<dyn Fn(&Error) + Send + Sync>,
}

impl FnCallback {
    /// Build a callback from success and failure closures.
    pub fn new<S, F>(on_success: S, on_failure: F) -> Arc<Self>
    where
        S: Fn() + Send + Sync + 'static,
        F: Fn(&Error) + Send + Sync + 'static,
    {
        Arc::new(Self {
            on_success: Box::new(on_success),
            on_failure: Box::new(on_failure),
        })
    }
}

impl FutureCallback for FnCallback {
    fn on_success(&self) {
        (self.on_success)()
    }

    fn on_failure(&self, error: &Error) {
        (self.on_failure)(error)
    }
}

impl std::fmt::Debug for FnCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCallback").finish_non_exhaustive()
    }
}

struct FutureState {
    state: TaskState,
    status: Option<Result<()>>,
    listeners: Vec<Arc<dyn FutureCallback>>,
}

/// A [`Task`] wrapped with a future: state machine, cached status, listener
/// list, and a single-shot completion latch.
///
/// `TaskFuture` is both the [`WorkItem`] the pool executes and the handle the
/// submitter observes; it is shared through an `Arc` between the two.
pub struct TaskFuture {
    task: Box<dyn Task>,
    state: Mutex<FutureState>,
    latch: CountdownLatch,
}

impl TaskFuture {
    /// Wrap a task. The future starts out `Pending` with a count-1 latch.
    pub fn new(task: Box<dyn Task>) -> Arc<Self> {
        Arc::new(Self {
            task,
            state: Mutex::new(FutureState {
                state: TaskState::Pending,
                status: None,
                listeners: Vec::new(),
            }),
            latch: CountdownLatch::new(1),
        })
    }

    /// Attempt a cooperative abort.
    ///
    /// Succeeds only if the future has not finished and the task itself
    /// accepts the abort. A task aborted while running still completes its
    /// `run`; the terminal state stays `Aborted` and the run's status is
    /// what listeners receive.
    pub fn abort(&self) -> bool {
        let mut st = self.state.lock();
        if st.state != TaskState::Finished && self.task.abort() {
            st.state = TaskState::Aborted;
            true
        } else {
            false
        }
    }

    /// Register a completion listener.
    ///
    /// Safe at any time. On a future that is already terminal the callback
    /// fires synchronously on the calling thread with the cached outcome;
    /// otherwise it is appended and fires exactly once, in registration
    /// order, when the future completes.
    pub fn add_listener(&self, listener: Arc<dyn FutureCallback>) {
        let outcome = {
            let mut st = self.state.lock();
            if st.state != TaskState::Finished && st.state != TaskState::Aborted {
                st.listeners.push(listener);
                return;
            }
            // An aborted future that never ran has no cached status; it
            // reports the abort itself.
            match &st.status {
                Some(Ok(())) => Ok(()),
                Some(Err(e)) => Err(e.clone()),
                None => Err(Error::aborted(ABORTED_BEFORE_RUN)),
            }
        };
        match outcome {
            Ok(()) => listener.on_success(),
            Err(e) => listener.on_failure(&e),
        }
    }

    /// True while the future is queued and unaborted.
    pub fn is_pending(&self) -> bool {
        self.state.lock().state == TaskState::Pending
    }

    /// True while the task executes.
    pub fn is_running(&self) -> bool {
        self.state.lock().state == TaskState::Running
    }

    /// True once the future is terminal (finished or aborted).
    pub fn is_done(&self) -> bool {
        matches!(
            self.state.lock().state,
            TaskState::Finished | TaskState::Aborted
        )
    }

    /// True once an abort has succeeded.
    pub fn is_aborted(&self) -> bool {
        self.state.lock().state == TaskState::Aborted
    }

    /// Block until the completion latch fires.
    pub fn wait(&self) {
        self.latch.wait();
    }

    /// Block until the latch fires or `deadline` passes; true on completion.
    pub fn timed_wait(&self, deadline: Instant) -> bool {
        self.latch.wait_until(deadline)
    }

    /// The cached final status. `None` until the latch has fired.
    pub fn status(&self) -> Option<Result<()>> {
        if self.latch.count() > 0 {
            return None;
        }
        self.state.lock().status.clone()
    }

    /// Move to `next` unless already aborted.
    fn try_set_state(&self, next: TaskState) -> bool {
        let mut st = self.state.lock();
        if st.state == TaskState::Aborted {
            return false;
        }
        st.state = next;
        true
    }

    /// Publish the outcome, drain the listener list, and return it.
    ///
    /// Draining at the terminal transition breaks reference cycles through
    /// listeners that close over this future. Listeners are invoked by the
    /// caller, outside the state lock.
    fn complete(&self, status: Result<()>) -> Vec<Arc<dyn FutureCallback>> {
        let mut st = self.state.lock();
        if st.state != TaskState::Aborted {
            st.state = TaskState::Finished;
        }
        st.status = Some(status);
        std::mem::take(&mut st.listeners)
    }
}

impl WorkItem for TaskFuture {
    fn run(&self) {
        if !self.try_set_state(TaskState::Running) {
            // Aborted before a worker got to it: don't touch the task, fail
            // the listeners, release the latch.
            let err = Error::aborted(ABORTED_BEFORE_RUN);
            let listeners = self.complete(Err(err.clone()));
            for listener in &listeners {
                listener.on_failure(&err);
            }
            self.latch.count_down();
            return;
        }

        let status = self.task.run();
        let listeners = self.complete(status.clone());
        match &status {
            Ok(()) => {
                for listener in &listeners {
                    listener.on_success();
                }
            }
            Err(e) => {
                for listener in &listeners {
                    listener.on_failure(e);
                }
            }
        }
        self.latch.count_down();
    }
}

impl std::fmt::Debug for TaskFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.state.lock();
        f.debug_struct("TaskFuture")
            .field("state", &st.state)
            .field("status", &st.status)
            .field("listeners", &st.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::task::FnTask;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_callback(ok: Arc<AtomicUsize>, failed: Arc<AtomicUsize>) -> Arc<FnCallback> {
        FnCallback::new(
            move || {
                ok.fetch_add(1, Ordering::SeqCst);
            },
            move |_| {
                failed.fetch_add(1, Ordering::SeqCst);
            },
        )
    }

    #[test]
    fn test_run_success_path() {
        let future = TaskFuture::new(Box::new(FnTask::new(|| Ok(()))));
        let ok = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        future.add_listener(counting_callback(ok.clone(), failed.clone()));

        assert!(future.is_pending());
        future.run();

        assert!(future.is_done());
        assert!(!future.is_aborted());
        assert_eq!(ok.load(Ordering::SeqCst), 1);
        assert_eq!(failed.load(Ordering::SeqCst), 0);
        assert_eq!(future.status(), Some(Ok(())));
    }

    #[test]
    fn test_run_failure_path() {
        let future = TaskFuture::new(Box::new(FnTask::new(|| {
            Err(Error::task_failed("bad input"))
        })));
        future.run();
        assert_eq!(future.status(), Some(Err(Error::task_failed("bad input"))));
    }

    #[test]
    fn test_abort_before_run() {
        let future = TaskFuture::new(Box::new(FnTask::with_abort(|| Ok(()), || true)));
        let ok = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        future.add_listener(counting_callback(ok.clone(), failed.clone()));

        assert!(future.abort());
        assert!(future.is_aborted());

        // The worker still runs the item; the run is substituted.
        future.run();
        assert_eq!(ok.load(Ordering::SeqCst), 0);
        assert_eq!(failed.load(Ordering::SeqCst), 1);
        assert!(matches!(future.status(), Some(Err(Error::Aborted(_)))));
    }

    #[test]
    fn test_abort_refused_by_task() {
        let future = TaskFuture::new(Box::new(FnTask::new(|| Ok(()))));
        assert!(!future.abort());
        assert!(future.is_pending());
    }

    #[test]
    fn test_abort_after_finish_fails() {
        let future = TaskFuture::new(Box::new(FnTask::with_abort(|| Ok(()), || true)));
        future.run();
        assert!(!future.abort());
    }

    #[test]
    fn test_no_state_change_after_abort() {
        let future = TaskFuture::new(Box::new(FnTask::with_abort(|| Ok(()), || true)));
        assert!(future.abort());
        assert!(!future.try_set_state(TaskState::Running));
        assert!(future.is_aborted());
    }

    #[test]
    fn test_late_listener_fires_synchronously() {
        let future = TaskFuture::new(Box::new(FnTask::new(|| Ok(()))));
        future.run();

        let ok = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        future.add_listener(counting_callback(ok.clone(), failed.clone()));
        assert_eq!(ok.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_late_listener_on_unrun_aborted_future() {
        let future = TaskFuture::new(Box::new(FnTask::with_abort(|| Ok(()), || true)));
        assert!(future.abort());

        let ok = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        future.add_listener(counting_callback(ok.clone(), failed.clone()));
        assert_eq!(failed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listeners_fire_in_registration_order() {
        let future = TaskFuture::new(Box::new(FnTask::new(|| Ok(()))));
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..4 {
            let order = order.clone();
            future.add_listener(FnCallback::new(
                move || order.lock().push(i),
                move |_| {},
            ));
        }
        future.run();
        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_status_none_before_completion() {
        let future = TaskFuture::new(Box::new(FnTask::new(|| Ok(()))));
        assert!(future.status().is_none());
        assert!(!future.timed_wait(Instant::now()));
    }

    #[test]
    fn test_listeners_dropped_after_completion() {
        let future = TaskFuture::new(Box::new(FnTask::new(|| Ok(()))));
        let marker = Arc::new(());
        let held = marker.clone();
        future.add_listener(FnCallback::new(
            move || {
                let _ = &held;
            },
            |_| {},
        ));
        assert_eq!(Arc::strong_count(&marker), 2);
        future.run();
        assert_eq!(Arc::strong_count(&marker), 1);
    }
}
