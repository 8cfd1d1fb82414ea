//! Delayed one-shot actions with a cancellation point
//!
//! Used for "do this later unless told otherwise" jobs such as a watchdog
//! that ends the process when a gesture hangs.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A closure scheduled to run once after a delay.
///
/// Dropping the handle does not cancel the action; call [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct DeferredAction {
    token: CancellationToken,
    task: JoinHandle<bool>,
}

impl DeferredAction {
    /// Run `action` after `delay` on the current tokio runtime. Returns
    /// immediately.
    pub fn schedule<F>(delay: Duration, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let child = token.clone();
        let task = tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => {
                    debug!("deferred action cancelled before {:?} elapsed", delay);
                    false
                }
                _ = tokio::time::sleep(delay) => {
                    debug!("deferred action firing after {:?}", delay);
                    action();
                    true
                }
            }
        });
        Self { token, task }
    }

    /// Stop the action if it has not started. No effect afterwards.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token that cancels this action when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for the outcome: `true` if the action ran.
    pub async fn join(self) -> bool {
        self.task.await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let action = DeferredAction::schedule(Duration::from_millis(300), move || {
            flag.store(true, Ordering::SeqCst);
        });
        assert!(!fired.load(Ordering::SeqCst));
        assert!(action.join().await);
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_run() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let action = DeferredAction::schedule(Duration::from_secs(5), move || {
            flag.store(true, Ordering::SeqCst);
        });
        action.cancel();
        assert!(action.is_cancelled());
        assert!(!action.join().await);
        assert!(!fired.load(Ordering::SeqCst));
    }
}
