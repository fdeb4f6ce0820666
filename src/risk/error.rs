//! Error types for the analysis client.

use thiserror::Error;

/// Failures from one analysis or projection request.
///
/// None of these are fatal: the caller shows a failed state and keeps
/// whatever result it already had.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Network failure or timeout.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the service.
    #[error("analysis service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Body exceeded the read cap; reading stopped there.
    #[error("analysis response larger than {limit} bytes")]
    TooLarge { limit: usize },

    /// 2xx response without any candidate text.
    #[error("analysis service returned no text")]
    EmptyResponse,

    /// Text was not JSON of the expected shape (including missing fields).
    #[error("malformed analysis payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Missing credential, bad header value, client construction.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AnalysisError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Short code for logging.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Http(e) if e.is_timeout() => "timeout",
            Self::Http(_) => "http_error",
            Self::Status { .. } => "status_error",
            Self::TooLarge { .. } => "too_large",
            Self::EmptyResponse => "empty_response",
            Self::Malformed(_) => "malformed",
            Self::Config(_) => "config_error",
        }
    }
}
