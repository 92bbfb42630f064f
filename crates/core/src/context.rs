//! Cancellation scope threaded through every suspension point of a call.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, TransportError};

/// A cancellation handle with an optional deadline.
///
/// Every operation has a `*_with_context` form that takes one of these. The
/// plain form runs under [`CallContext::background`], which never cancels.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use scc_core::CallContext;
///
/// let ctx = CallContext::background().with_timeout(Duration::from_secs(10));
/// assert!(ctx.check().is_ok());
///
/// ctx.cancel();
/// assert!(ctx.check().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A scope that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A scope driven by an existing cancellation token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Set a deadline relative to now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set an absolute deadline. An earlier existing deadline is kept.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// A child scope: cancelled when this one is, but cancellable on its own.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// The underlying cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel this scope and all of its children.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Fail fast if the scope is already cancelled or past its deadline.
    pub fn check(&self) -> Result<(), Error> {
        if self.token.is_cancelled() {
            return Err(TransportError::Cancelled.into());
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(TransportError::DeadlineExceeded.into());
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the scope is cancelled or its
    /// deadline passes first.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Error>
    where
        F: Future,
    {
        self.check()?;
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(TransportError::Cancelled.into()),
            () = deadline_elapsed(self.deadline) => Err(TransportError::DeadlineExceeded.into()),
            out = fut => Ok(out),
        }
    }

    /// Sleep for `duration`, waking early with an error on cancellation.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Error> {
        self.run(tokio::time::sleep(duration)).await
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn background_runs_to_completion() {
        let ctx = CallContext::background();
        let out = ctx.run(async { 7 }).await.unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test]
    async fn cancelled_scope_rejects_before_polling() {
        let ctx = CallContext::background();
        ctx.cancel();
        let err = ctx.run(async { 1 }).await.unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::Cancelled)));
    }

    #[tokio::test]
    async fn cancel_interrupts_sleep() {
        let ctx = CallContext::background();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let err = ctx.sleep(Duration::from_secs(3600)).await.unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::Cancelled)));
    }

    #[tokio::test]
    async fn deadline_interrupts_sleep() {
        tokio::time::pause();
        let ctx = CallContext::background().with_timeout(Duration::from_millis(50));
        let err = ctx.sleep(Duration::from_secs(3600)).await.unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn child_follows_parent_cancellation() {
        let parent = CallContext::background();
        let child = parent.child();
        parent.cancel();
        assert!(child.check().is_err());

        let parent = CallContext::background();
        let child = parent.child();
        child.cancel();
        assert!(parent.check().is_ok());
    }

    #[test]
    fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = CallContext::background()
            .with_deadline(now + Duration::from_secs(5))
            .with_deadline(now + Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(5)));
    }
}
