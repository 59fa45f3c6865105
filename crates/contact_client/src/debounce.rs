//! Single-slot debounce: only the most recently scheduled callback may run.

use std::{future::Future, time::Duration};

use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `f` once `delay` has passed without another call to `schedule`
    /// or `cancel`. Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&mut self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            f().await;
        }));
    }

    /// Discards the pending callback. Returns whether one was still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[path = "tests/debounce_tests.rs"]
mod tests;
