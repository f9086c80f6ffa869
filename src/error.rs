use reqwest::StatusCode;

/// Errors raised while talking to the recommendation service or driving a session
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Recommendation service returned status {status}: {message}")]
    ExternalApi { status: StatusCode, message: String },

    #[error("Failed to decode recommendation response: {0}")]
    Decode(String),

    #[error("Session identity has not been assigned yet")]
    MissingSessionIdentity,

    #[error("User is not authenticated")]
    NotAuthenticated,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the failure came from the remote side (transport or status)
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            AppError::HttpClient(_) | AppError::ExternalApi { .. } | AppError::Decode(_)
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;
