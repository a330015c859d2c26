/// Error types for video-ranking-service
///
/// `EngineError` is what the core reports per stage; `AppError` is its HTTP rendering.
/// Store error text never reaches API clients, it is logged where the failure happens.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;
use thiserror::Error;

use crate::models::PendingDurableWrite;

/// Which backing store a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    RankingStore,
    DurableStore,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::RankingStore => "ranking_store",
            StoreKind::DurableStore => "durable_store",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamReason {
    /// The caller-supplied deadline elapsed
    Timeout,
    /// The store was unreachable; the command was not applied
    Unavailable,
    /// The store reported an error; the command may or may not have been applied
    Backend,
}

impl UpstreamReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamReason::Timeout => "timeout",
            UpstreamReason::Unavailable => "unavailable",
            UpstreamReason::Backend => "backend",
        }
    }
}

impl fmt::Display for UpstreamReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Invalid interaction: {0}")]
    Validation(String),

    #[error("Video {video_id} is owned by another user")]
    ConstraintViolation { video_id: String },

    #[error("{store} call failed ({reason}): {detail}")]
    Upstream {
        store: StoreKind,
        reason: UpstreamReason,
        detail: String,
        /// Set when the ranking store was already updated and only the durable half remains.
        pending: Option<PendingDurableWrite>,
    },

    /// The owner lookup that precedes any write failed; neither store was touched.
    #[error("Ownership check failed ({reason}): {detail}")]
    OwnershipCheck {
        reason: UpstreamReason,
        detail: String,
    },

    #[error("Interaction worker aborted: {0}")]
    Aborted(String),
}

impl EngineError {
    pub fn store(&self) -> Option<StoreKind> {
        match self {
            EngineError::Upstream { store, .. } => Some(*store),
            EngineError::OwnershipCheck { .. } => Some(StoreKind::DurableStore),
            _ => None,
        }
    }

    /// Where a store failure happened, as reported to HTTP clients.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            EngineError::Upstream { store, .. } => Some(store.as_str()),
            EngineError::OwnershipCheck { .. } => Some("ownership_check"),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            EngineError::Upstream {
                reason: UpstreamReason::Timeout,
                ..
            } | EngineError::OwnershipCheck {
                reason: UpstreamReason::Timeout,
                ..
            }
        )
    }

    /// Whether re-submitting the whole event is safe.
    ///
    /// A failed ownership check and a ranking-store failure known not to have been
    /// applied qualify. A durable-store write failure must be re-driven through its
    /// `pending` write instead.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            EngineError::OwnershipCheck { .. }
                | EngineError::Upstream {
                    store: StoreKind::RankingStore,
                    reason: UpstreamReason::Unavailable,
                    ..
                }
        )
    }

    pub fn pending(&self) -> Option<&PendingDurableWrite> {
        match self {
            EngineError::Upstream { pending, .. } => pending.as_ref(),
            _ => None,
        }
    }
}

/// Result type for HTTP handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}")]
    Upstream {
        stage: &'static str,
        message: &'static str,
        retriable: bool,
    },

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Render a store failure with a fixed client-facing message.
    pub fn from_engine(err: EngineError, upstream_message: &'static str) -> Self {
        match err {
            EngineError::Validation(msg) => AppError::BadRequest(msg),
            EngineError::ConstraintViolation { .. } => AppError::Conflict(err.to_string()),
            EngineError::Upstream { .. } | EngineError::OwnershipCheck { .. } => {
                AppError::Upstream {
                    stage: err.stage().unwrap_or("upstream"),
                    message: upstream_message,
                    retriable: err.is_retriable(),
                }
            }
            EngineError::Aborted(_) => AppError::Internal("Internal error".to_string()),
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let message = match &err {
            EngineError::OwnershipCheck { .. } => "Failed to verify video owner",
            _ if err.store() == Some(StoreKind::RankingStore) => {
                "Failed to update score in ranking store"
            }
            _ => "Failed to update score in durable store",
        };
        AppError::from_engine(err, message)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Upstream { .. } | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let mut body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        if let AppError::Upstream {
            stage, retriable, ..
        } = self
        {
            body["stage"] = serde_json::Value::from(*stage);
            body["retriable"] = serde_json::Value::from(*retriable);
        }

        HttpResponse::build(status).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(store: StoreKind, reason: UpstreamReason) -> EngineError {
        EngineError::Upstream {
            store,
            reason,
            detail: "connection reset by peer".to_string(),
            pending: None,
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::from(EngineError::Validation("bad".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(EngineError::ConstraintViolation {
                video_id: "v1".into()
            })
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(upstream(StoreKind::DurableStore, UpstreamReason::Backend))
                .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upstream_detail_is_not_exposed() {
        let app_err = AppError::from(upstream(StoreKind::RankingStore, UpstreamReason::Backend));
        let rendered = app_err.to_string();
        assert!(!rendered.contains("connection reset"));
        assert_eq!(rendered, "Failed to update score in ranking store");
    }

    #[test]
    fn test_retry_classification() {
        assert!(upstream(StoreKind::RankingStore, UpstreamReason::Unavailable).is_retriable());
        assert!(!upstream(StoreKind::RankingStore, UpstreamReason::Timeout).is_retriable());
        assert!(!upstream(StoreKind::DurableStore, UpstreamReason::Unavailable).is_retriable());
        assert!(upstream(StoreKind::DurableStore, UpstreamReason::Timeout).is_timeout());
        assert!(!EngineError::Validation("x".into()).is_retriable());
    }

    #[test]
    fn test_failed_ownership_check_is_retriable() {
        let err = EngineError::OwnershipCheck {
            reason: UpstreamReason::Timeout,
            detail: "deadline of 500ms exceeded".to_string(),
        };
        assert!(err.is_retriable());
        assert!(err.is_timeout());
        assert!(err.pending().is_none());
        assert_eq!(err.stage(), Some("ownership_check"));

        let durable = upstream(StoreKind::DurableStore, UpstreamReason::Unavailable);
        assert_eq!(durable.stage(), Some("durable_store"));

        match AppError::from(err) {
            AppError::Upstream {
                stage,
                message,
                retriable,
            } => {
                assert_eq!(stage, "ownership_check");
                assert_eq!(message, "Failed to verify video owner");
                assert!(retriable);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
