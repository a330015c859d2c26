use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use video_ranking_service::config::{Config, StoreBackend};
use video_ranking_service::db::pool::{create_pool, migrate};
use video_ranking_service::db::{
    MemoryRankingStore, MemoryRecordStore, PgRecordStore, RankingStore, RecordStore,
    RedisRankingStore,
};
use video_ranking_service::handlers;
use video_ranking_service::jobs::start_reconciler;
use video_ranking_service::state::AppState;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Tracing is not installed yet, so configuration errors go to stderr
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(config.app.is_development());

    info!(
        env = %config.app.env,
        backend = ?config.store.backend,
        store_timeout_ms = config.store.timeout.as_millis() as u64,
        enforce_ownership = config.engine.enforce_ownership,
        "Starting video-ranking-service"
    );

    let (ranking, records) = build_stores(&config).await?;

    tokio::spawn(start_reconciler(
        ranking.clone(),
        records.clone(),
        config.reconcile.clone(),
        config.store.timeout,
    ));

    let state = web::Data::new(AppState::new(
        ranking,
        records,
        config.engine.engine_config(),
        config.store.timeout,
        config.engine.max_top_limit,
    ));

    let bind_addr = format!("{}:{}", config.app.listen_addr, config.app.port);
    info!("HTTP server listening on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await
    .context("HTTP server error")
}

fn init_tracing(is_development: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info".into());

    if is_development {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_target(true),
            )
            .init();
    }
}

async fn build_stores(config: &Config) -> Result<(Arc<dyn RankingStore>, Arc<dyn RecordStore>)> {
    match config.store.backend {
        StoreBackend::RedisPostgres => {
            let ranking =
                RedisRankingStore::connect(&config.redis.url, config.redis.ranking_key.clone())
                    .await?;

            let pool = create_pool(&config.database)
                .await
                .context("Failed to create database pool")?;
            migrate(&pool)
                .await
                .context("Failed to run database migrations")?;

            Ok((Arc::new(ranking), Arc::new(PgRecordStore::new(pool))))
        }
        StoreBackend::Memory => {
            warn!("Using in-process stores; scores are lost on restart");
            Ok((
                Arc::new(MemoryRankingStore::new()),
                Arc::new(MemoryRecordStore::new()),
            ))
        }
    }
}
