// SPDX-License-Identifier: GPL-3.0-or-later

use reqwest::StatusCode;
use thiserror::Error;

/// Error taxonomy shared by the artwork providers. The enrichment worker
/// keys its retry decisions off these kinds.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider has no artwork for this id; terminal, never retried.
    #[error("artwork not found")]
    NotFound,

    /// Upstream signalled backoff (429).
    #[error("rate limited by upstream")]
    RateLimited,

    /// Retryable upstream failure (502/503/504) or transport blip.
    #[error("temporary upstream failure: {0}")]
    Temporary(String),

    /// Unrecognized status code; surfaced as failure without retry.
    #[error("upstream error: {status} - {message}")]
    Upstream { status: u16, message: String },

    #[error("response exceeds size cap: {size} bytes")]
    TooLarge { size: usize },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Whether the worker should reschedule with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Temporary(_))
    }

    pub(crate) fn from_status(status: StatusCode, message: String) -> Self {
        match status.as_u16() {
            404 => Self::NotFound,
            429 => Self::RateLimited,
            502 | 503 | 504 => Self::Temporary(format!("status {}: {}", status, message)),
            code => Self::Upstream { status: code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            Self::Temporary(error.to_string())
        } else {
            Self::Upstream {
                status: error.status().map(|s| s.as_u16()).unwrap_or(0),
                message: error.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidResponse(error.to_string())
    }
}

/// Image payload fetched from a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Content type from the first bytes of the payload: JPEG, PNG, GIF and
/// WebP carry distinctive magic numbers within the first 12 bytes.
pub(crate) fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() >= 3 && bytes[0] == 0xFF && bytes[1] == 0xD8 && bytes[2] == 0xFF {
        return Some("image/jpeg");
    }
    if bytes.len() >= 8 && bytes[..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return Some("image/png");
    }
    if bytes.len() >= 4 && &bytes[..4] == b"GIF8" {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    None
}
