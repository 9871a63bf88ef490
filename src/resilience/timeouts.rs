//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound every protected call by a deadline
//! - Async calls are cancelled (dropped) when the deadline fires
//! - Blocking calls cannot be cancelled: they finish in the background and
//!   their result is discarded
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout is reported distinctly from the operation's own errors

use std::future::Future;
use std::time::Duration;
use tokio::time;

/// The deadline fired before the operation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed(pub Duration);

/// How a blocking operation ended, if it ended in time.
#[derive(Debug)]
pub enum BlockingOutcome<R> {
    Returned(R),
    Panicked,
}

/// Run `fut` under `limit`. On expiry the future is dropped.
pub async fn with_deadline<F>(limit: Duration, fut: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    time::timeout(limit, fut).await.map_err(|_| Elapsed(limit))
}

/// Run `f` on the blocking pool under `limit`.
///
/// On expiry the closure keeps running detached; whatever it eventually
/// returns is dropped.
pub async fn blocking_with_deadline<F, R>(
    limit: Duration,
    f: F,
) -> Result<BlockingOutcome<R>, Elapsed>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(f);
    match time::timeout(limit, handle).await {
        Ok(Ok(value)) => Ok(BlockingOutcome::Returned(value)),
        Ok(Err(join_error)) => {
            tracing::error!(error = %join_error, "Blocking call did not complete");
            Ok(BlockingOutcome::Panicked)
        }
        Err(_) => Err(Elapsed(limit)),
    }
}
