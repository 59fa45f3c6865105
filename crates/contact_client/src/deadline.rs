//! Absolute submission timeout expressed as a cancellation token.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;

/// A child of the dialog session token that is also cancelled once
/// `timeout` has elapsed from [`SubmissionDeadline::arm`].
#[derive(Debug)]
pub struct SubmissionDeadline {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
    timer: Option<JoinHandle<()>>,
}

impl SubmissionDeadline {
    pub fn arm(parent: &CancellationToken, timeout: Duration) -> Self {
        let expires_at = Instant::now() + timeout;
        let token = parent.child_token();
        let fired = Arc::new(AtomicBool::new(false));

        let timer = tokio::spawn({
            let token = token.clone();
            let fired = Arc::clone(&fired);
            async move {
                tokio::time::sleep_until(expires_at).await;
                fired.store(true, Ordering::SeqCst);
                token.cancel();
            }
        });

        Self {
            token,
            fired,
            timer: Some(timer),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True only when the timer fired, not when the parent was cancelled.
    pub fn timed_out(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Stops the timer. Safe to call any number of times.
    pub fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for SubmissionDeadline {
    fn drop(&mut self) {
        self.disarm();
    }
}
