//! HTTP recommendation provider
//!
//! Talks to the recommendation service over JSON:
//! 1. Initial batch: GET /recommend/initial → recommendations + userId
//! 2. Follow-up batches: POST /recommend with the recent liked/disliked ids
//!
//! Authentication is ambient: the client keeps a cookie store and can be seeded
//! with a session cookie obtained by the (external) login flow.

use reqwest::{
    header::{HeaderMap, HeaderValue, COOKIE},
    Client as HttpClient, RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::Instrument;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    middleware::request_id::{make_span_with_request_id, with_request_id},
    models::{ErrorPayload, InitialRecommendations, RecommendationBatch, RecommendationRequest},
    services::providers::RecommendationProvider,
};

#[derive(Clone)]
pub struct HttpRecommendationProvider {
    http_client: HttpClient,
    api_url: String,
}

impl HttpRecommendationProvider {
    /// Creates a provider against `api_url`
    pub fn new(
        api_url: impl Into<String>,
        timeout: Duration,
        session_cookie: Option<&str>,
    ) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| AppError::Internal(format!("Invalid session cookie: {}", e)))?;
            headers.insert(COOKIE, value);
        }

        let http_client = HttpClient::builder()
            .cookie_store(true)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        let api_url = api_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            http_client,
            api_url,
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            config.api_base_url.clone(),
            config.request_timeout(),
            config.session_cookie.as_deref(),
        )
    }

    /// Asks the service whether the ambient credential is still valid
    ///
    /// Any non-success answer counts as "not authenticated"; only transport
    /// failures are errors.
    pub async fn check_auth_status(&self) -> AppResult<bool> {
        let url = format!("{}/status", self.api_url);
        let (builder, request_id) = with_request_id(self.http_client.get(&url));
        let span = make_span_with_request_id("GET", "/status", &request_id);

        let response = builder.send().instrument(span).await?;
        let authenticated = response.status().is_success();
        tracing::debug!(
            request_id = %request_id,
            status = %response.status(),
            authenticated,
            "Auth status checked"
        );

        Ok(authenticated)
    }

    /// Sends a prepared request and decodes the JSON answer
    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> AppResult<T> {
        let response = builder.send().await?;
        Self::decode(response).await
    }

    /// Turns a service response into `T`, mapping non-success statuses to errors
    ///
    /// 401 and 403 mean the ambient credential is gone and surface as
    /// [`AppError::NotAuthenticated`].
    async fn decode<T: DeserializeOwned>(response: Response) -> AppResult<T> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = %status,
                message = %error_message(status, &body),
                "Recommendation service rejected the session credential"
            );
            return Err(AppError::NotAuthenticated);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi {
                status,
                message: error_message(status, &body),
            });
        }

        let response_text = response.text().await?;
        tracing::debug!(response = %response_text, "Raw recommendation response");

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                response = %response_text,
                "Failed to deserialize recommendation response"
            );
            AppError::Decode(e.to_string())
        })
    }
}

/// Message for a failed call: the payload's `message`/`error`, else the status reason
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.describe())
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| status.as_str().to_string())
}

#[async_trait::async_trait]
impl RecommendationProvider for HttpRecommendationProvider {
    async fn fetch_initial(&self) -> AppResult<InitialRecommendations> {
        let url = format!("{}/recommend/initial", self.api_url);
        let (builder, request_id) = with_request_id(self.http_client.get(&url));
        let span = make_span_with_request_id("GET", "/recommend/initial", &request_id);

        let initial: InitialRecommendations = Self::send(builder).instrument(span).await?;

        tracing::info!(
            request_id = %request_id,
            user_id = %initial.user_id,
            results = initial.recommendations.len(),
            provider = self.name(),
            "Initial recommendations fetched"
        );

        Ok(initial)
    }

    async fn fetch_more(&self, request: &RecommendationRequest) -> AppResult<RecommendationBatch> {
        let url = format!("{}/recommend", self.api_url);
        let (builder, request_id) = with_request_id(self.http_client.post(&url).json(request));
        let span = make_span_with_request_id("POST", "/recommend", &request_id);

        let batch: RecommendationBatch = Self::send(builder).instrument(span).await?;

        tracing::info!(
            request_id = %request_id,
            liked = request.liked_movie_ids.len(),
            disliked = request.disliked_movie_ids.len(),
            results = batch.recommendations.len(),
            provider = self.name(),
            "Recommendations fetched"
        );

        Ok(batch)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
