/// Interaction and ranking API handlers
///
/// Writes go through the ranking engine; reads query one store directly.
use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::error::{AppError, Result, StoreKind};
use crate::models::{InteractionEvent, InteractionRequest, UserTopVideosResponse};
use crate::services::upstream;
use crate::state::AppState;

pub const DEFAULT_LIMIT: usize = 10;

/// Query parameters for the top-N endpoints
///
/// `limit` is kept as text so an unparsable value falls back to the default
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct TopQuery {
    pub limit: Option<String>,
}

impl TopQuery {
    /// Requested limit, defaulted and clamped to `[1, max]`.
    pub fn resolve(&self, max: usize) -> usize {
        let requested = self
            .limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_LIMIT as i64);

        requested.clamp(1, max.max(1) as i64) as usize
    }
}

/// POST /videos/{video_id}/interaction
#[post("/videos/{video_id}/interaction")]
pub async fn record_interaction(
    path: web::Path<String>,
    body: web::Json<InteractionRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let video_id = path.into_inner();

    let event = InteractionEvent::from_request(&video_id, body.into_inner()).map_err(|msg| {
        debug!(video_id = %video_id, reason = %msg, "Rejected interaction");
        AppError::BadRequest(msg)
    })?;
    let kind = event.kind;

    let outcome = state
        .engine
        .apply(event, state.store_timeout)
        .await
        .map_err(|err| {
            match err.pending() {
                Some(pending) => error!(
                    video_id = %pending.video_id,
                    owner_id = %pending.owner_id,
                    delta = pending.delta,
                    error = %err,
                    "Interaction only partially applied"
                ),
                None => warn!(video_id = %video_id, interaction = %kind, error = %err, "Interaction failed"),
            }
            AppError::from(err)
        })?;

    Ok(HttpResponse::Ok().json(outcome))
}

/// GET /videos/top?limit=N
///
/// Global leaderboard from the ranking store.
#[get("/videos/top")]
pub async fn global_top_videos(
    query: web::Query<TopQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let limit = query.resolve(state.max_top_limit);

    let videos = upstream::call(
        StoreKind::RankingStore,
        "top",
        state.store_timeout,
        state.ranking.top(limit),
    )
    .await
    .map_err(|err| AppError::from_engine(err, "Error fetching top videos"))?;

    Ok(HttpResponse::Ok().json(videos))
}

/// GET /users/{user_id}/videos/top?limit=N
///
/// Owner-scoped leaderboard from the durable store.
#[get("/users/{user_id}/videos/top")]
pub async fn user_top_videos(
    path: web::Path<String>,
    query: web::Query<TopQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let limit = query.resolve(state.max_top_limit);

    let videos = upstream::call(
        StoreKind::DurableStore,
        "top_by_owner",
        state.store_timeout,
        state.records.top_by_owner(&user_id, limit),
    )
    .await
    .map_err(|err| AppError::from_engine(err, "Error fetching personalized videos"))?;

    Ok(HttpResponse::Ok().json(UserTopVideosResponse { user_id, videos }))
}
