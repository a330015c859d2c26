/// Deadline and retry wrapper around store calls
///
/// Every store call, on the write path and the read path, goes through here so it
/// carries the caller's deadline and reports failures as `EngineError::Upstream`.
use resilience::{with_deadline, with_retry, DeadlineExceeded, RetryConfig};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::db::{StoreError, StoreResult};
use crate::error::{EngineError, StoreKind, UpstreamReason};
use crate::metrics::{STORE_CALL_DURATION_SECONDS, STORE_FAILURES_TOTAL};

/// Run one store call under `deadline`.
pub async fn call<T, F>(
    store: StoreKind,
    op: &'static str,
    deadline: Duration,
    future: F,
) -> Result<T, EngineError>
where
    F: Future<Output = StoreResult<T>>,
{
    let start = Instant::now();
    let result = with_deadline(deadline, future).await;
    finish(store, op, start, result)
}

/// Run a store call, retrying while the store reports it unreachable.
///
/// The deadline bounds all attempts together.
pub async fn call_with_retry<T, F, Fut>(
    store: StoreKind,
    op: &'static str,
    deadline: Duration,
    retry: RetryConfig,
    f: F,
) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let start = Instant::now();
    let result = with_deadline(deadline, with_retry(retry, StoreError::is_retriable, f)).await;
    finish(store, op, start, result)
}

fn finish<T>(
    store: StoreKind,
    op: &'static str,
    start: Instant,
    result: Result<StoreResult<T>, DeadlineExceeded>,
) -> Result<T, EngineError> {
    STORE_CALL_DURATION_SECONDS
        .with_label_values(&[store.as_str(), op])
        .observe(start.elapsed().as_secs_f64());

    let (reason, detail) = match result {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(StoreError::OwnershipConflict {
            video_id,
            recorded_owner,
        })) => {
            warn!(%store, op, video_id, recorded_owner, "Ownership conflict");
            return Err(EngineError::ConstraintViolation { video_id });
        }
        Ok(Err(StoreError::Unavailable(detail))) => (UpstreamReason::Unavailable, detail),
        Ok(Err(StoreError::Backend(detail))) => (UpstreamReason::Backend, detail),
        Err(elapsed) => (UpstreamReason::Timeout, elapsed.to_string()),
    };

    STORE_FAILURES_TOTAL
        .with_label_values(&[store.as_str(), reason.as_str()])
        .inc();
    warn!(%store, op, %reason, error = %detail, "Store call failed");

    Err(EngineError::Upstream {
        store,
        reason,
        detail,
        pending: None,
    })
}
