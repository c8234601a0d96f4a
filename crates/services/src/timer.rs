//! Owned, cancellable deferred work.
//!
//! Each pending timer lives in exactly one `TaskHandle` held by the engine that
//! scheduled it. Cancelling (or dropping) the handle stops the timer if it has
//! not fired yet. Work the timer hands off when it fires (e.g. a network call)
//! is spawned separately and is not affected.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

#[derive(Debug, Default)]
pub struct TaskHandle(Option<JoinHandle<()>>);

impl TaskHandle {
    /// A handle with nothing scheduled.
    #[must_use]
    pub fn idle() -> Self {
        Self(None)
    }

    /// Stop the task if it is still pending. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }

    /// Cancel whatever was pending and hold `next` instead.
    pub fn replace(&mut self, next: TaskHandle) {
        self.cancel();
        *self = next;
    }

    /// True while a scheduled task has neither fired to completion nor been cancelled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.0.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Run `fire` once after `delay`, unless the returned handle is cancelled first.
///
/// Must be called from within a Tokio runtime.
pub fn after<F>(delay: Duration, fire: F) -> TaskHandle
where
    F: FnOnce() + Send + 'static,
{
    TaskHandle(Some(tokio::spawn(async move {
        time::sleep(delay).await;
        fire();
    })))
}

/// Call `tick` every `period`, starting one period from now, until it breaks
/// or the handle is cancelled.
///
/// Must be called from within a Tokio runtime.
pub fn every<F>(period: Duration, mut tick: F) -> TaskHandle
where
    F: FnMut() -> ControlFlow<()> + Send + 'static,
{
    TaskHandle(Some(tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
        loop {
            interval.tick().await;
            if tick().is_break() {
                break;
            }
        }
    })))
}
