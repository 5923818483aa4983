//! Bounded retry combinator.

use std::future::Future;
use tracing::warn;

use crate::error::{LeashError, Result};

/// Outcome of an exhausted or aborted retry loop.
#[derive(Debug)]
pub struct RetryError {
    /// Attempts actually made.
    pub attempts: u32,
    pub last: LeashError,
}

/// Run `op` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` attempts (first try included) have failed.
///
/// `op` receives the 1-based attempt number. Attempts follow each other
/// immediately.
pub async fn attempt<T, F, Fut>(max_attempts: u32, mut op: F) -> std::result::Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut n = 1;
    loop {
        match op(n).await {
            Ok(value) => return Ok(value),
            Err(err) if n < max_attempts && err.is_retryable() => {
                warn!(attempt = n, max_attempts, error = %err, "attempt failed, retrying");
                n += 1;
            }
            Err(err) => {
                return Err(RetryError {
                    attempts: n,
                    last: err,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> LeashError {
        LeashError::Status {
            url: "http://test/metric".to_string(),
            status: 503,
        }
    }

    #[tokio::test]
    async fn test_first_success_makes_one_call() {
        let calls = AtomicU32::new(0);
        let value = attempt(5, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7u64) }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let value = attempt(5, |n| async move {
            if n < 4 {
                Err(transient())
            } else {
                Ok(n)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 4);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let err = attempt(5, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(transient()) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(matches!(err.last, LeashError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_auth_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let err = attempt(5, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(LeashError::NotAuthenticated) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_max_attempts_still_tries_once() {
        let err = attempt(0, |_| async { Err::<(), _>(transient()) })
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 1);
    }
}
