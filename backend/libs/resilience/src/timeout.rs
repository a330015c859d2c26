/// Deadline wrapper for async operations
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Operation timed out after {0:?}")]
pub struct DeadlineExceeded(pub Duration);

/// Run a future under a caller-supplied deadline.
///
/// The inner output is returned untouched; only the elapsed case is mapped.
pub async fn with_deadline<F, T>(deadline: Duration, future: F) -> Result<T, DeadlineExceeded>
where
    F: Future<Output = T>,
{
    timeout(deadline, future)
        .await
        .map_err(|_| DeadlineExceeded(deadline))
}
