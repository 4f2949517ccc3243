//! Shared utilities for use cases.
//!
//! Cancellation helpers used by every step of a run.

use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Whether cancellation has been requested on `token`.
pub(crate) fn is_cancelled(token: &Option<CancellationToken>) -> bool {
    token.as_ref().is_some_and(|t| t.is_cancelled())
}

/// Await `fut` unless `token` fires first.
///
/// Returns `None` when cancelled. The cancellation branch is polled first so
/// an already-cancelled token never starts the future.
pub(crate) async fn cancellable<F: Future>(
    token: &Option<CancellationToken>,
    fut: F,
) -> Option<F::Output> {
    match token {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                out = fut => Some(out),
            }
        }
        None => Some(fut.await),
    }
}

/// Nanosecond timestamp used to build unique request and run ids.
pub(crate) fn now_nanos() -> i64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| chrono::Utc::now().timestamp_micros() * 1_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancellable_without_token() {
        assert_eq!(cancellable(&None, async { 7 }).await, Some(7));
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_future() {
        let token = CancellationToken::new();
        token.cancel();
        let token = Some(token);
        assert!(is_cancelled(&token));
        assert_eq!(cancellable(&token, async { 7 }).await, None);
    }
}
