use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Identifier of a recommended item
///
/// The service treats ids as opaque; in practice they arrive either as JSON
/// numbers or strings, and both are kept verbatim so they round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Numeric(u64),
    Text(String),
}

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemId::Numeric(id) => write!(f, "{}", id),
            ItemId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        ItemId::Numeric(id)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        ItemId::Text(id.to_string())
    }
}

/// A recommended candidate as delivered by the service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    #[serde(rename = "movieId", alias = "id")]
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, alias = "posterUrl")]
    pub poster_url: Option<String>,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            genres: Vec::new(),
            poster_url: None,
        }
    }

    pub fn with_poster_url(mut self, poster_url: impl Into<String>) -> Self {
        self.poster_url = Some(poster_url.into());
        self
    }

    /// Poster to display, falling back to `default` when the service sent none
    pub fn poster_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.poster_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(default)
    }
}

/// Which way an item was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Swipe right / like
    Accept,
    /// Swipe left / discard
    Reject,
}

impl Direction {
    /// Maps a raw swipe direction to a decision
    ///
    /// Only horizontal swipes decide anything; vertical ones return `None`.
    pub fn from_swipe(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "right" => Some(Direction::Accept),
            "left" => Some(Direction::Reject),
            _ => None,
        }
    }

    pub fn as_swipe(&self) -> &'static str {
        match self {
            Direction::Accept => "right",
            Direction::Reject => "left",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Accept => write!(f, "accept"),
            Direction::Reject => write!(f, "reject"),
        }
    }
}

/// One entry in the decision history
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Decision {
    pub item: Item,
    pub direction: Direction,
    pub decided_at: DateTime<Utc>,
}

impl Decision {
    pub fn new(item: Item, direction: Direction) -> Self {
        Self {
            item,
            direction,
            decided_at: Utc::now(),
        }
    }
}
