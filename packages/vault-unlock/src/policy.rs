//! Completion polling policy and cancellation
//!
//! There is no push notification from L2, so completion is observed by a
//! bounded number of status reads. Polling is the only phase a caller can
//! abort.

use std::time::Duration;
use tokio::sync::watch;

/// How often and how many times the Vault status is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between consecutive reads
    pub interval: Duration,
    /// Maximum number of reads; zero is treated as one
    pub max_attempts: u32,
}

impl PollPolicy {
    /// A run always reads at least once, so `max_attempts` is clamped to 1
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Reads a run performs before giving up
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wall-clock bound of a full polling run
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.attempts())
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 30,
        }
    }
}

/// Cloneable cancellation signal.
///
/// Every clone observes the same flag; cancelling is sticky.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Signal all holders
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_default_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert_eq!(policy.max_attempts, 30);
        assert_eq!(policy.budget(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_attempts_still_reads_once() {
        let policy = PollPolicy::new(Duration::from_millis(10), 0);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.attempts(), 1);

        // Literal construction skips `new` but not the clamp
        let literal = PollPolicy {
            interval: Duration::from_millis(10),
            max_attempts: 0,
        };
        assert_eq!(literal.attempts(), 1);
        assert_eq!(literal.budget(), Duration::from_millis(10));
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());

        // Sticky
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancelled_future_wakes_on_cancel() {
        let token = CancelToken::new();
        let mut waiter = task::spawn(token.cancelled());
        assert_pending!(waiter.poll());

        token.cancel();
        assert!(waiter.is_woken());
        assert_ready!(waiter.poll());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_immediately_when_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .unwrap();
    }
}
