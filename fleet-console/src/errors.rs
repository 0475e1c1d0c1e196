use thiserror::Error;

/// Failures talking to the dashboard API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Session is not authenticated")]
    Unauthorized,

    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Invalid credentials: {0}")]
    Rejected(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}
