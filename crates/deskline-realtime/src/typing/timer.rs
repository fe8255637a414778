//! Cancellable one-shot expiry timer.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// A one-shot timer that runs a callback unless cancelled first.
///
/// Dropping the timer cancels it, so a timer stored next to the state it
/// guards can never outlive that state.
#[derive(Debug)]
pub struct ExpiryTimer {
    token: CancellationToken,
}

impl ExpiryTimer {
    /// Arms a timer that calls `on_expire` after `after`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn arm<F>(after: Duration, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let deadline = Instant::now() + after;
        let child = token.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = child.cancelled() => {}
                _ = sleep_until(deadline) => on_expire(),
            }
        });

        Self { token }
    }

    /// Cancels the timer. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True until the timer is cancelled.
    pub fn is_armed(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_deadline() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let _timer = ExpiryTimer::arm(Duration::from_millis(100), move || {
            flag.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(99)).await;
        assert!(!fired.load(Ordering::SeqCst));
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let timer = ExpiryTimer::arm(Duration::from_millis(100), move || {
            flag.store(true, Ordering::SeqCst);
        });
        assert!(timer.is_armed());
        drop(timer);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
