/// Resilience helpers for calls into external stores
///
/// - **Deadline**: every call gets a caller-supplied time budget
/// - **Retry**: bounded exponential backoff with jitter, gated by a predicate
///   so that only failures known to be safe to repeat are retried
///
/// # Example: Redis command with a deadline and retry on connection refusal
///
/// ```rust,no_run
/// use resilience::{with_deadline, with_retry, RetryConfig};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let result = with_deadline(
///         Duration::from_millis(500),
///         with_retry(
///             RetryConfig::default(),
///             |err: &String| err.contains("refused"),
///             || async { Ok::<_, String>(()) },
///         ),
///     )
///     .await;
///     assert!(result.is_ok());
/// }
/// ```

pub mod retry;
pub mod timeout;

pub use retry::{with_retry, RetryConfig};
pub use timeout::{with_deadline, DeadlineExceeded};
