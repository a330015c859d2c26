pub mod videos;

use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};
use tracing::debug;

use crate::error::AppError;
use crate::metrics::serve_metrics;

pub use videos::{global_top_videos, record_interaction, user_top_videos, TopQuery};

/// Register every route of the service on an actix `App`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(invalid_payload))
        .route("/health", web::get().to(health))
        .route("/metrics", web::get().to(serve_metrics))
        .service(record_interaction)
        .service(global_top_videos)
        .service(user_top_videos);
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

fn invalid_payload(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!(path = %req.path(), error = %err, "Rejected malformed interaction payload");
    AppError::BadRequest("Invalid payload".to_string()).into()
}
