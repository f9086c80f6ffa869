//! Recommendation service abstraction
//!
//! The session core only ever talks to the remote ranking oracle through this
//! trait, so tests and alternative transports can stand in for the HTTP client.

use crate::{
    error::AppResult,
    models::{InitialRecommendations, RecommendationBatch, RecommendationRequest},
};

pub mod http;

pub use http::HttpRecommendationProvider;

/// Trait for recommendation service clients
///
/// Both calls rely on an ambient authenticated session held by the
/// implementation (cookie, token); callers never pass credentials explicitly.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecommendationProvider: Send + Sync {
    /// Fetch the first batch of a session along with the session identity
    async fn fetch_initial(&self) -> AppResult<InitialRecommendations>;

    /// Fetch a follow-up batch given recent decision history
    ///
    /// An empty batch means the service has nothing more to offer right now.
    async fn fetch_more(&self, request: &RecommendationRequest) -> AppResult<RecommendationBatch>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
