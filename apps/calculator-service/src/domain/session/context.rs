//! Call Context
//!
//! Deadline and cancellation for one call. Handlers route every suspension
//! point (receive, send, simulated work) through [`CallContext::guard`], so an
//! expired deadline or a cancellation is observed at the next await rather
//! than after outstanding work completes.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::error::CallError;

/// Deadline and cancellation signal scoped to one call.
#[derive(Debug, Clone)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

impl CallContext {
    /// Context without a deadline, cancelled through `cancel`.
    #[must_use]
    pub const fn new(cancel: CancellationToken) -> Self {
        Self {
            deadline: None,
            cancel,
        }
    }

    /// Set the deadline to `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set an absolute deadline. An earlier existing deadline wins.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        self
    }

    /// The deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` without one.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Cancel the call.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the call was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The underlying cancellation token.
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fail fast if the call was cancelled or its deadline has passed.
    pub fn check(&self) -> Result<(), CallError> {
        if self.cancel.is_cancelled() {
            return Err(CallError::cancelled("call cancelled by caller"));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(CallError::deadline_exceeded("deadline elapsed"));
        }
        Ok(())
    }

    /// Run `fut` unless the call is cancelled or times out first.
    ///
    /// Cancellation and deadline are polled before `fut`, so a future that
    /// becomes ready at the same instant the deadline fires still loses.
    pub async fn guard<F>(&self, fut: F) -> Result<F::Output, CallError>
    where
        F: Future,
    {
        self.check()?;

        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(CallError::cancelled("call cancelled by caller")),
            () = expired => Err(CallError::deadline_exceeded("deadline elapsed")),
            out = fut => Ok(out),
        }
    }

    /// Sleep for `duration`, aborting early on cancellation or deadline.
    pub async fn sleep(&self, duration: Duration) -> Result<(), CallError> {
        self.guard(tokio::time::sleep(duration)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::ErrorKind;

    #[tokio::test(start_paused = true)]
    async fn guard_passes_through_without_deadline() {
        let ctx = CallContext::default();
        assert_eq!(ctx.guard(async { 7 }).await, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn guard_observes_deadline() {
        let ctx = CallContext::default().with_timeout(Duration::from_millis(100));
        let err = ctx.sleep(Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
    }

    #[tokio::test(start_paused = true)]
    async fn guard_observes_cancellation() {
        let ctx = CallContext::default();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let err = ctx.sleep(Duration::from_secs(5)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn check_fails_after_deadline() {
        let ctx = CallContext::default().with_timeout(Duration::from_millis(5));
        assert!(ctx.check().is_ok());
        tokio::time::advance(Duration::from_millis(10)).await;
        assert_eq!(ctx.check().unwrap_err().kind(), ErrorKind::DeadlineExceeded);
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = CallContext::default()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(5));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }
}
