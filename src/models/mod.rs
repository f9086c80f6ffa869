use serde::{Deserialize, Serialize};
use std::fmt::Display;

mod item;

pub use item::{Decision, Direction, Item, ItemId};

/// Opaque user/session identifier handed out by the initial fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionIdentity {
    Numeric(u64),
    Text(String),
}

impl Display for SessionIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionIdentity::Numeric(id) => write!(f, "{}", id),
            SessionIdentity::Text(id) => write!(f, "{}", id),
        }
    }
}

// ============================================================================
// Recommendation Service Wire Types
// ============================================================================

/// Response from GET /recommend/initial
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InitialRecommendations {
    #[serde(default)]
    pub recommendations: Vec<Item>,
    pub user_id: SessionIdentity,
}

/// Body of POST /recommend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub user_id: SessionIdentity,
    pub liked_movie_ids: Vec<ItemId>,
    pub disliked_movie_ids: Vec<ItemId>,
}

/// Response from POST /recommend
///
/// The service answers "nothing left" with a 200 carrying only a `message`,
/// so a missing list decodes as an empty batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecommendationBatch {
    #[serde(default)]
    pub recommendations: Vec<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Error payload carried by non-success responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorPayload {
    /// Best human-readable description, if the service sent one
    pub fn describe(&self) -> Option<String> {
        self.message.clone().or_else(|| self.error.clone())
    }
}
