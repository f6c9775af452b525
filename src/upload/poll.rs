// ABOUTME: Fixed-interval polling with cancellation.
// ABOUTME: Shared by the disk readiness waits and the transfer phase wait.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::error::UploadError;

/// Result of a single poll.
pub(crate) enum Attempt<T> {
    Ready(T),
    /// Not there yet; the reason is kept for the timeout error.
    Pending(String),
}

/// Call `attempt` every `interval` until it is ready, it fails, or `cancel` fires.
///
/// Cancellation yields `UploadError::DeadlineExceeded` carrying the last
/// pending reason.
pub(crate) async fn poll_until<T, F, Fut>(
    interval: Duration,
    cancel: &CancellationToken,
    waiting_for: &str,
    mut attempt: F,
) -> Result<T, UploadError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Attempt<T>, UploadError>>,
{
    let mut last_reason = None;
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        match attempt().await? {
            Attempt::Ready(value) => {
                tracing::debug!(waiting_for, polls, "ready");
                return Ok(value);
            }
            Attempt::Pending(reason) => {
                tracing::debug!(waiting_for, polls, %reason, "not ready yet");
                last_reason = Some(reason);
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(UploadError::deadline(waiting_for, last_reason));
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
