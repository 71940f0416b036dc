//! Reference-counted trace contexts attached to pool submissions.
//!
//! A submitter with a current trace context has that context retained by the
//! queue entry, so the submitter can go away while the work waits. The worker
//! adopts the context for the duration of the work item's run, taking over
//! the queue's reference.

use parking_lot::Mutex;
use std::cell::RefCell;
use std::sync::Arc;
use std::time::Instant;

thread_local! {
    static CURRENT_TRACE: RefCell<Option<Arc<TraceContext>>> = const { RefCell::new(None) };
}

/// A timestamped diagnostic message recorded against a trace context.
#[derive(Debug, Clone)]
pub struct TraceEntry {
    /// When the message was recorded
    pub timestamp: Instant,
    /// The message text
    pub message: String,
}

/// A shared diagnostic context for one logical operation.
///
/// Contexts are cheap to clone through their `Arc` handle and are carried
/// across threads by the pool: whichever thread currently holds the context
/// attached records into the same buffer.
pub struct TraceContext {
    label: String,
    entries: Mutex<Vec<TraceEntry>>,
}

impl TraceContext {
    /// Create a new context with a diagnostic label.
    pub fn new<S: Into<String>>(label: S) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            entries: Mutex::new(Vec::new()),
        })
    }

    /// The context label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Record a message against this context.
    pub fn record<S: Into<String>>(&self, message: S) {
        self.entries.lock().push(TraceEntry {
            timestamp: Instant::now(),
            message: message.into(),
        });
    }

    /// Snapshot of all recorded entries.
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.entries.lock().clone()
    }

    /// The calling thread's current context, if any.
    pub fn current() -> Option<Arc<TraceContext>> {
        CURRENT_TRACE.with(|c| c.borrow().clone())
    }

    /// Attach `ctx` as the calling thread's current context.
    ///
    /// The previous context is restored when the returned guard drops.
    pub fn attach(ctx: Arc<TraceContext>) -> TraceGuard {
        let prev = CURRENT_TRACE.with(|c| c.borrow_mut().replace(ctx));
        TraceGuard { prev }
    }

    /// Attach an optional context; `None` leaves the thread without one for
    /// the guard's lifetime.
    pub fn adopt(ctx: Option<Arc<TraceContext>>) -> TraceGuard {
        let prev = CURRENT_TRACE.with(|c| std::mem::replace(&mut *c.borrow_mut(), ctx));
        TraceGuard { prev }
    }

    /// Record into the calling thread's current context, if there is one.
    pub fn record_current<S: Into<String>>(message: S) {
        if let Some(ctx) = Self::current() {
            ctx.record(message);
        }
    }
}

impl std::fmt::Debug for TraceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceContext")
            .field("label", &self.label)
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}

/// Guard restoring the thread's previous trace context on drop.
#[derive(Debug)]
pub struct TraceGuard {
    prev: Option<Arc<TraceContext>>,
}

impl Drop for TraceGuard {
    fn drop(&mut self) {
        let prev = self.prev.take();
        CURRENT_TRACE.with(|c| *c.borrow_mut() = prev);
    }
}
