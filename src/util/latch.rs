//! Countdown latch used as a single-shot completion signal.

use parking_lot::{Condvar, Mutex};
use std::time::Instant;

/// A latch that releases waiters once its count reaches zero.
///
/// Task futures use a count of one: the latch fires exactly once, after the
/// terminal transition and listener delivery.
pub struct CountdownLatch {
    count: Mutex<usize>,
    done: Condvar,
}

impl CountdownLatch {
    /// Create a latch with the given initial count.
    pub fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            done: Condvar::new(),
        }
    }

    /// Decrement the count, waking all waiters when it reaches zero.
    ///
    /// Counting down past zero is a no-op.
    pub fn count_down(&self) {
        let mut count = self.count.lock();
        if *count == 0 {
            return;
        }
        *count -= 1;
        if *count == 0 {
            self.done.notify_all();
        }
    }

    /// Block until the count reaches zero.
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.done.wait(&mut count);
        }
    }

    /// Block until the count reaches zero or `deadline` passes.
    ///
    /// Returns true if the latch fired, false on deadline.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut count = self.count.lock();
        while *count > 0 {
            if self.done.wait_until(&mut count, deadline).timed_out() {
                return *count == 0;
            }
        }
        true
    }

    /// Current count.
    pub fn count(&self) -> usize {
        *self.count.lock()
    }
}

impl std::fmt::Debug for CountdownLatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownLatch")
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_count_down_releases_waiter() {
        let latch = Arc::new(CountdownLatch::new(1));
        let latch2 = latch.clone();

        let handle = std::thread::spawn(move || {
            latch2.wait();
        });

        latch.count_down();
        handle.join().unwrap();
        assert_eq!(latch.count(), 0);
    }

    #[test]
    fn test_wait_until_deadline() {
        let latch = CountdownLatch::new(1);
        let fired = latch.wait_until(Instant::now() + Duration::from_millis(20));
        assert!(!fired);

        latch.count_down();
        assert!(latch.wait_until(Instant::now()));
    }

    #[test]
    fn test_count_down_past_zero() {
        let latch = CountdownLatch::new(1);
        latch.count_down();
        latch.count_down();
        assert_eq!(latch.count(), 0);
    }

    #[test]
    fn test_multi_count() {
        let latch = CountdownLatch::new(3);
        latch.count_down();
        latch.count_down();
        assert!(!latch.wait_until(Instant::now()));
        latch.count_down();
        latch.wait();
    }
}
