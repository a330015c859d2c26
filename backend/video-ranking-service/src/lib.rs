//! Video ranking service
//!
//! Turns user interactions into score deltas and keeps two projections of each
//! video's score: a Redis sorted set for the global leaderboard and a PostgreSQL
//! table for owner-scoped rankings.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, EngineError};
pub use services::{EngineConfig, RankingEngine};
pub use state::AppState;
