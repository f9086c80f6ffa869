use std::time::Duration;

use serde::Deserialize;

/// Prefix for every environment variable read by [`Config::from_env`]
pub const ENV_PREFIX: &str = "SWIPE_";

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the recommendation service
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// How long a resolved card animates before the decision is committed
    #[serde(default = "default_settle_duration_ms")]
    pub settle_duration_ms: u64,

    /// Number of most recent accepted/rejected ids sent with each refill
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Timeout applied to every request against the recommendation service
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Drop incoming candidates already queued or already decided
    #[serde(default = "default_dedupe_candidates")]
    pub dedupe_candidates: bool,

    /// Poster shown for items the service sends without one
    #[serde(default = "default_poster_url")]
    pub default_poster_url: String,

    /// Session cookie obtained by the login flow, sent as the ambient credential
    #[serde(default)]
    pub session_cookie: Option<String>,

    /// tracing-subscriber filter directive
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_api_base_url() -> String {
    "http://localhost:5001".to_string()
}

fn default_settle_duration_ms() -> u64 {
    500
}

fn default_history_window() -> usize {
    5
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_dedupe_candidates() -> bool {
    true
}

fn default_poster_url() -> String {
    "https://critics.io/img/movies/poster-placeholder.png".to_string()
}

fn default_log_filter() -> String {
    "swipe_session=info".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::prefixed(ENV_PREFIX)
            .from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The part of the configuration the session core consumes
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            settle_duration: Duration::from_millis(self.settle_duration_ms),
            history_window: self.history_window,
            dedupe_candidates: self.dedupe_candidates,
        }
    }
}

/// Tuning knobs for the session manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub settle_duration: Duration,
    pub history_window: usize,
    pub dedupe_candidates: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_duration: Duration::from_millis(default_settle_duration_ms()),
            history_window: default_history_window(),
            dedupe_candidates: default_dedupe_candidates(),
        }
    }
}
