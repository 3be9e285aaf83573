//! Cancellation token support for host shutdown signaling.
//!
//! Hosted services receive a token linked from the caller's token and the
//! application stopping signal; stop sweeps additionally link a
//! graceful-shutdown timeout token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A token that can be used to signal cancellation across async operations.
///
/// Tokens form a chain: a child token observes its parents' cancellation
/// without propagating its own cancellation upward. The host hands these to
/// hosted services so shutdown requests reach in-flight start and stop work.
///
/// # Examples
///
/// ```
/// use scene_host::CancellationToken;
///
/// let stopping = CancellationToken::new();
/// let per_service = stopping.child_token();
///
/// stopping.cancel();
/// assert!(per_service.is_cancelled());
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<CancellationTokenInner>,
}

struct CancellationTokenInner {
    cancelled: AtomicBool,
    parents: Vec<CancellationToken>,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancellationTokenInner {
                cancelled: AtomicBool::new(false),
                parents: Vec::new(),
            }),
        }
    }

    /// Creates a child token that is cancelled when either this token or the
    /// child itself is cancelled.
    ///
    /// Cancelling the child does not cancel the parent.
    ///
    /// # Examples
    ///
    /// ```
    /// use scene_host::CancellationToken;
    ///
    /// let parent = CancellationToken::new();
    /// let child = parent.child_token();
    ///
    /// child.cancel();
    /// assert!(!parent.is_cancelled());
    /// assert!(child.is_cancelled());
    /// ```
    pub fn child_token(&self) -> Self {
        Self {
            inner: Arc::new(CancellationTokenInner {
                cancelled: AtomicBool::new(false),
                parents: vec![self.clone()],
            }),
        }
    }

    /// Creates a token that is cancelled when either of the given tokens is
    /// cancelled.
    ///
    /// The stop sweep links the caller's token with a timeout token this way.
    pub fn linked(a: &CancellationToken, b: &CancellationToken) -> Self {
        Self {
            inner: Arc::new(CancellationTokenInner {
                cancelled: AtomicBool::new(false),
                parents: vec![a.clone(), b.clone()],
            }),
        }
    }

    /// Cancels the token, signaling that associated operations should stop.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// Returns true if cancellation has been requested on this token or any
    /// of its parents.
    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return true;
        }
        self.inner.parents.iter().any(|p| p.is_cancelled())
    }

    /// Returns a cancellation error if the token is cancelled.
    pub fn throw_if_cancelled(&self) -> Result<(), CancellationError> {
        if self.is_cancelled() {
            Err(CancellationError::new("Operation was cancelled"))
        } else {
            Ok(())
        }
    }

    /// Returns a future that completes when cancellation is requested.
    ///
    /// Intended for `tokio::select!` races against in-flight operations.
    ///
    /// # Examples
    ///
    /// ```
    /// use scene_host::CancellationToken;
    ///
    /// # async fn example() {
    /// let token = CancellationToken::new();
    ///
    /// tokio::select! {
    ///     _ = some_operation() => {}
    ///     _ = token.cancelled() => {}
    /// }
    /// # }
    /// # async fn some_operation() {}
    /// ```
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            // Small delay to avoid busy waiting
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    /// Creates a token that automatically cancels after the given duration.
    ///
    /// Used for the graceful-shutdown timeout on stop sweeps.
    pub fn with_timeout(timeout: Duration) -> Self {
        let token = Self::new();
        let token_clone = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            token_clone.cancel();
        });

        token
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Error type for cancellation operations.
#[derive(Debug, Clone)]
pub struct CancellationError {
    message: String,
}

impl CancellationError {
    /// Creates a new cancellation error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CancellationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cancellation error: {}", self.message)
    }
}

impl std::error::Error for CancellationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn basic_cancellation() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn child_sees_parent_cancellation() {
        let parent = CancellationToken::new();
        let child = parent.child_token();

        assert!(!child.is_cancelled());

        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn child_cancellation_does_not_propagate_up() {
        let parent = CancellationToken::new();
        let child = parent.child_token();

        child.cancel();
        assert!(!parent.is_cancelled());
        assert!(child.is_cancelled());
    }

    #[test]
    fn linked_token_observes_both_sources() {
        let a = CancellationToken::new();
        let b = CancellationToken::new();
        let linked = CancellationToken::linked(&a, &b);

        assert!(!linked.is_cancelled());
        b.cancel();
        assert!(linked.is_cancelled());
        assert!(!a.is_cancelled());
    }

    #[test]
    fn throw_if_cancelled() {
        let token = CancellationToken::new();
        assert!(token.throw_if_cancelled().is_ok());

        token.cancel();
        assert!(token.throw_if_cancelled().is_err());
    }

    #[tokio::test]
    async fn timeout_cancellation() {
        let token = CancellationToken::with_timeout(Duration::from_millis(10));
        assert!(!token.is_cancelled());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_future_resolves() {
        let token = CancellationToken::new();
        let token_clone = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token_clone.cancel();
        });

        token.cancelled().await;
        assert!(token.is_cancelled());
    }
}
