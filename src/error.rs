use axum::{
    response::{IntoResponse, Response},
    Json,
    http::StatusCode,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Failures of the outbound page fetch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream page not found")]
    NotFound,

    #[error("upstream request failed: {0}")]
    Upstream(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("request is missing the url parameter")]
    MissingUrl,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("malformed request body: {0}")]
    InvalidRequest(String),

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Error extracting content: {0}")]
    ExtractionError(String),

    #[error("LLM processing error: {0}")]
    LlmError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// Status code and user-facing message. Variant payloads stay in the logs.
    pub fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::MissingUrl => (StatusCode::BAD_REQUEST, "A URL is required."),
            AppError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "The URL is not valid."),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "The request body is not valid JSON."),
            AppError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "The request body is too large."),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests. Please try again in a moment.",
            ),
            AppError::Fetch(FetchError::Timeout) => (
                StatusCode::REQUEST_TIMEOUT,
                "Timed out while accessing the URL.",
            ),
            AppError::Fetch(FetchError::NotFound) => (StatusCode::NOT_FOUND, "The page could not be found."),
            AppError::Fetch(FetchError::Upstream(_))
            | AppError::ExtractionError(_)
            | AppError::LlmError(_)
            | AppError::ConfigError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while processing the URL.",
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        let body = Json(ErrorResponse {
            error: message.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<std::env::VarError> for AppError {
    fn from(err: std::env::VarError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
