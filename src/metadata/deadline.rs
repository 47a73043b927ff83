//! Deadline-bounded fetches

use crate::error::{OverlayError, OverlayResult};
use std::future::Future;
use std::time::Duration;

/// Result of a fetch raced against a deadline
#[derive(Debug)]
pub enum FetchOutcome<T> {
    Success(T),
    TimedOut(Duration),
    Failed(OverlayError),
}

impl<T> FetchOutcome<T> {
    /// Collapse into a result, mapping the timeout to [`OverlayError::Timeout`]
    pub fn into_result(self) -> OverlayResult<T> {
        match self {
            Self::Success(value) => Ok(value),
            Self::TimedOut(deadline) => Err(OverlayError::Timeout(deadline)),
            Self::Failed(e) => Err(e),
        }
    }
}

/// Run `fetch`, giving up once `deadline` elapses
///
/// The fetch future is dropped on timeout.
pub async fn with_deadline<T, F>(deadline: Duration, fetch: F) -> FetchOutcome<T>
where
    F: Future<Output = OverlayResult<T>>,
{
    match tokio::time::timeout(deadline, fetch).await {
        Ok(Ok(value)) => FetchOutcome::Success(value),
        Ok(Err(e)) => FetchOutcome::Failed(e),
        Err(_) => FetchOutcome::TimedOut(deadline),
    }
}
