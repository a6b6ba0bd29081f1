//! Deferred scheduling
//!
//! Test code yields to pending request futures through a [`Timer`]: a
//! single-fire future that sleeps for a delay and then runs an optional
//! callback in the same turn it completes. The [`Scheduler`] hands out timers
//! with a shared, runtime-adjustable default delay.
//!
//! Timers are driven by `tokio::time`, so tests running with a paused clock
//! advance through them deterministically.

use crate::config::MockConfig;
use parking_lot::RwLock;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{sleep, Instant, Sleep};

/// Callback type of a timer without a callback
pub type NoCallback = fn();

fn no_callback() {}

/// One deferred firing.
///
/// Completes once the deadline has passed, running the callback exactly once
/// and yielding its return value. Dropping or [cancelling](Timer::cancel) the
/// timer before then means the callback never runs.
#[must_use = "timers do nothing unless awaited"]
pub struct Timer<F> {
    sleep: Pin<Box<Sleep>>,
    callback: Option<F>,
}

// The callback is never pinned; it is moved out by value when the timer fires.
impl<F> Unpin for Timer<F> {}

impl<F> Timer<F> {
    /// Timer firing `callback` after `delay`
    pub fn new(delay: Duration, callback: F) -> Self {
        Self {
            sleep: Box::pin(sleep(delay)),
            callback: Some(callback),
        }
    }

    /// When the timer fires
    pub fn deadline(&self) -> Instant {
        self.sleep.deadline()
    }

    /// Whether the deadline has passed
    pub fn is_elapsed(&self) -> bool {
        self.sleep.is_elapsed()
    }

    /// Whether the timer already fired
    pub fn has_fired(&self) -> bool {
        self.callback.is_none()
    }

    /// Drop the timer without running its callback
    pub fn cancel(self) {}
}

impl<F, T> Future for Timer<F>
where
    F: FnOnce() -> T,
{
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();
        if this.sleep.as_mut().poll(cx).is_pending() {
            return Poll::Pending;
        }
        match this.callback.take() {
            Some(callback) => Poll::Ready(callback()),
            None => panic!("`Timer` polled after it fired"),
        }
    }
}

impl<F> fmt::Debug for Timer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("deadline", &self.deadline())
            .field("fired", &self.has_fired())
            .finish()
    }
}

/// Hands out timers with a shared default delay
#[derive(Debug, Clone)]
pub struct Scheduler {
    delay: Arc<RwLock<Duration>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(MockConfig::default().delay())
    }
}

impl Scheduler {
    /// Scheduler with the given default delay
    pub fn new(delay: Duration) -> Self {
        Self {
            delay: Arc::new(RwLock::new(delay)),
        }
    }

    /// Current default delay
    pub fn delay(&self) -> Duration {
        *self.delay.read()
    }

    /// Change the default delay for every holder of this scheduler
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.write() = delay;
    }

    /// Fire after the default delay
    pub fn wait(&self) -> Timer<NoCallback> {
        Timer::new(self.delay(), no_callback as NoCallback)
    }

    /// Fire after `delay`
    pub fn wait_for(&self, delay: Duration) -> Timer<NoCallback> {
        Timer::new(delay, no_callback as NoCallback)
    }

    /// Run `callback` after the default delay
    pub fn wait_then<F, T>(&self, callback: F) -> Timer<F>
    where
        F: FnOnce() -> T,
    {
        Timer::new(self.delay(), callback)
    }

    /// Run `callback` after `delay`
    pub fn wait_for_then<F, T>(&self, delay: Duration, callback: F) -> Timer<F>
    where
        F: FnOnce() -> T,
    {
        Timer::new(delay, callback)
    }
}
