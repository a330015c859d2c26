/// Score policy: maps an interaction to the score delta it contributes.
///
/// Pure and side-effect free.
use thiserror::Error;

use crate::models::InteractionType;

pub const VIEW_DELTA: f64 = 0.1;
pub const LIKE_DELTA: f64 = 1.0;
pub const COMMENT_DELTA: f64 = 1.5;
pub const SHARE_DELTA: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("Unknown interaction type: {0:?}")]
    InvalidInteractionType(String),

    #[error("watch_time interactions require a weight")]
    MissingWeight,
}

/// Delta for a parsed interaction type.
///
/// Fixed-table types ignore `weight`; `watch_time` returns it verbatim.
pub fn delta(kind: InteractionType, weight: Option<f64>) -> Result<f64, PolicyError> {
    match kind {
        InteractionType::View => Ok(VIEW_DELTA),
        InteractionType::Like => Ok(LIKE_DELTA),
        InteractionType::Comment => Ok(COMMENT_DELTA),
        InteractionType::Share => Ok(SHARE_DELTA),
        InteractionType::WatchTime => weight.ok_or(PolicyError::MissingWeight),
    }
}

/// Delta for a wire-format type string.
pub fn delta_for(kind: &str, weight: Option<f64>) -> Result<f64, PolicyError> {
    delta(kind.parse()?, weight)
}
