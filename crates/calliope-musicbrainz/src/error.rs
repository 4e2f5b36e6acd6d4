// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MusicBrainzError>;

#[derive(Debug, Error)]
pub enum MusicBrainzError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("rate limited by upstream")]
    RateLimited,

    #[error("invalid response from identifier service: {0}")]
    InvalidResponse(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl MusicBrainzError {
    /// Transient errors are worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited => true,
            Self::ApiError { status, .. } => matches!(status, 502 | 503 | 504),
            Self::RequestFailed(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
