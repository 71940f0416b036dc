//! User-level task payloads.

use crate::error::Result;
use parking_lot::Mutex;

/// A unit of user work with an optional cooperative abort hook.
///
/// `run` is called at most once, from a pool worker. `abort` may be called
/// from any thread while the task is pending or running; returning true
/// means the task agrees to be (or has been) cancelled. The default is
/// non-abortable.
pub trait Task: Send + Sync {
    /// Execute the task, returning its final status.
    fn run(&self) -> Result<()>;

    /// Ask the task to cancel. Returns whether the abort is accepted.
    fn abort(&self) -> bool {
        false
    }
}

type RunFn = Box<dyn FnOnce() -> Result<()> + Send>;
type AbortFn = Box<dyn Fn() -> bool + Send + Sync>;

/// Adapts bare closures into a [`Task`].
///
/// The run closure is taken on first execution; the abort closure, when
/// present, is consulted on every [`Task::abort`] call.
pub struct FnTask {
    run: Mutex<Option<RunFn>>,
    abort: Option<AbortFn>,
}

impl FnTask {
    /// A task from a run closure; abort always refuses.
    pub fn new<F>(run: F) -> Self
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        Self {
            run: Mutex::new(Some(Box::new(run))),
            abort: None,
        }
    }

    /// A task from a run closure and an abort hook.
    pub fn with_abort<F, A>(run: F, abort: A) -> Self
    where
        F: FnOnce() -> Result<()> + Send + 'static,
        A: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            run: Mutex::new(Some(Box::new(run))),
            abort: Some(Box::new(abort)),
        }
    }
}

impl Task for FnTask {
    fn run(&self) -> Result<()> {
        match self.run.lock().take() {
            Some(f) => f(),
            None => Ok(()),
        }
    }

    fn abort(&self) -> bool {
        match &self.abort {
            Some(f) => f(),
            None => false,
        }
    }
}

impl std::fmt::Debug for FnTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTask")
            .field("abortable", &self.abort.is_some())
            .finish()
    }
}
