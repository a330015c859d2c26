use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::services::score_policy::PolicyError;

/// Kind of user interaction that moves a video's score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionType {
    View,
    Like,
    Comment,
    Share,
    WatchTime,
}

impl InteractionType {
    pub const ALL: [InteractionType; 5] = [
        InteractionType::View,
        InteractionType::Like,
        InteractionType::Comment,
        InteractionType::Share,
        InteractionType::WatchTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::View => "view",
            InteractionType::Like => "like",
            InteractionType::Comment => "comment",
            InteractionType::Share => "share",
            InteractionType::WatchTime => "watch_time",
        }
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionType {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(InteractionType::View),
            "like" => Ok(InteractionType::Like),
            "comment" => Ok(InteractionType::Comment),
            "share" => Ok(InteractionType::Share),
            "watch_time" => Ok(InteractionType::WatchTime),
            other => Err(PolicyError::InvalidInteractionType(other.to_string())),
        }
    }
}

/// Body of `POST /videos/{video_id}/interaction`
///
/// `user_id` is the owner of the video, not the viewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionRequest {
    #[serde(rename = "type", default)]
    pub interaction_type: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// A validated interaction, consumed once by the ranking engine
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionEvent {
    pub video_id: String,
    pub owner_id: String,
    pub kind: InteractionType,
    pub weight: Option<f64>,
}

impl InteractionEvent {
    pub fn new(
        video_id: impl Into<String>,
        owner_id: impl Into<String>,
        kind: InteractionType,
        weight: Option<f64>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            owner_id: owner_id.into(),
            kind,
            weight,
        }
    }

    /// Build an event from the wire request, reporting the first problem found.
    pub fn from_request(video_id: &str, req: InteractionRequest) -> Result<Self, String> {
        let video_id = video_id.trim();
        if video_id.is_empty() {
            return Err("Missing video_id in path".to_string());
        }

        let owner_id = match req.user_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Err("Missing user_id in payload".to_string()),
        };

        let kind: InteractionType = req
            .interaction_type
            .parse()
            .map_err(|e: PolicyError| e.to_string())?;

        if kind == InteractionType::WatchTime && req.weight.is_none() {
            return Err(PolicyError::MissingWeight.to_string());
        }

        Ok(Self {
            video_id: video_id.to_string(),
            owner_id,
            kind,
            weight: req.weight,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.video_id.trim().is_empty() {
            return Err("video_id must not be empty".to_string());
        }
        if self.owner_id.trim().is_empty() {
            return Err("user_id must not be empty".to_string());
        }
        Ok(())
    }
}

/// Durable half of an interaction whose ranking-store half already succeeded
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDurableWrite {
    pub video_id: String,
    pub owner_id: String,
    pub delta: f64,
}

/// Durable per-video record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Video {
    #[serde(rename = "VideoID")]
    pub video_id: String,
    #[serde(rename = "UserID")]
    pub user_id: String,
    #[serde(rename = "Score")]
    pub score: f64,
}

/// Result of a successfully applied interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionOutcome {
    #[serde(rename = "videoID")]
    pub video_id: String,
    pub delta: f64,
    pub status: String,
}

impl InteractionOutcome {
    pub fn updated(video_id: impl Into<String>, delta: f64) -> Self {
        Self {
            video_id: video_id.into(),
            delta,
            status: "updated".to_string(),
        }
    }
}

/// Response of `GET /users/{userID}/videos/top`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTopVideosResponse {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub videos: Vec<Video>,
}
