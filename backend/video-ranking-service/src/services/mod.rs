pub mod ranking_engine;
pub mod score_policy;
pub mod upstream;

pub use ranking_engine::{EngineConfig, RankingEngine};
pub use score_policy::PolicyError;
