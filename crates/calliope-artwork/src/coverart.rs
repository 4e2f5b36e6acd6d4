// SPDX-License-Identifier: GPL-3.0-or-later

use calliope_musicbrainz::RateLimiter;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{sniff_mime, FetchedImage, ProviderError};

const COVER_ART_ARCHIVE_BASE: &str = "https://coverartarchive.org";
const USER_AGENT: &str = concat!(
    "Calliope/",
    env!("CARGO_PKG_VERSION"),
    " ( https://github.com/calliope-audio/calliope )"
);

/// Image payloads are capped at 10 MiB.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Primary album-cover provider: fetches front-cover bytes by external
/// release id.
#[derive(Debug, Clone)]
pub struct CoverArtClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl CoverArtClient {
    pub fn new(base_url: Option<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| COVER_ART_ARCHIVE_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            rate_limiter: RateLimiter::per_second(1.0),
        })
    }

    /// Fetch the front cover for a release. 404 means the archive has no
    /// cover; the caller treats that as a permanent miss.
    pub async fn fetch_front(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchedImage, ProviderError> {
        self.rate_limiter
            .wait(cancel)
            .await
            .map_err(|_| ProviderError::Cancelled)?;

        let url = format!("{}/release/{}/front", self.base_url, external_id);
        debug!(target: "coverart", url = %url, "fetching front cover");

        let request = self.client.get(&url).header("Accept", "image/*").send();
        let response = tokio::select! {
            response = request => response?,
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, message));
        }

        if let Some(length) = response.content_length() {
            if length as usize > MAX_IMAGE_BYTES {
                return Err(ProviderError::TooLarge { size: length as usize });
            }
        }

        let header_mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("image/"))
            .map(|v| v.to_string());

        let bytes = read_capped(response, cancel).await?;

        let mime_type = header_mime
            .or_else(|| sniff_mime(&bytes).map(|m| m.to_string()))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        debug!(
            target: "coverart",
            external_id,
            bytes = bytes.len(),
            mime = %mime_type,
            "cover fetched"
        );
        Ok(FetchedImage { bytes, mime_type })
    }
}

/// Drain the body chunk by chunk so an oversized payload is rejected
/// without buffering the whole thing first.
pub(crate) async fn read_capped(
    mut response: reqwest::Response,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, ProviderError> {
    let mut bytes = Vec::new();
    loop {
        let chunk = tokio::select! {
            chunk = response.chunk() => chunk?,
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
        };
        let Some(chunk) = chunk else { break };
        if bytes.len() + chunk.len() > MAX_IMAGE_BYTES {
            return Err(ProviderError::TooLarge {
                size: bytes.len() + chunk.len(),
            });
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
