// SPDX-License-Identifier: GPL-3.0-or-later

use calliope_musicbrainz::RateLimiter;
use moka::sync::Cache;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::coverart::read_capped;
use crate::error::{sniff_mime, FetchedImage, ProviderError};

const FANARTTV_BASE: &str = "https://webservice.fanart.tv/v3/music";

/// Preferred artist-image provider. Looks up image metadata by external
/// artist id, then downloads the best-liked thumb.
pub struct FanartTvClient {
    api_key: String,
    client: Client,
    rate_limiter: RateLimiter,
    cache: Cache<String, Option<ImageCandidate>>,
    base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ImageCandidate {
    url: String,
    likes: u32,
}

#[derive(Debug, Deserialize)]
struct ArtistImagesResponse {
    #[serde(rename = "artistthumb", default)]
    thumbs: Vec<ImageItem>,
    #[serde(rename = "artistbackground", default)]
    backgrounds: Vec<ImageItem>,
}

#[derive(Debug, Deserialize)]
struct ImageItem {
    url: String,
    // fanart.tv serializes likes as a string
    likes: Option<String>,
}

impl FanartTvClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            api_key,
            client,
            rate_limiter: RateLimiter::per_second(1.0),
            cache: Cache::new(10_000),
            base_url: base_url
                .unwrap_or_else(|| FANARTTV_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    /// Fetch the artist image with the greatest likes count. An artist the
    /// provider knows nothing about is a permanent miss.
    pub async fn fetch_artist_image(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchedImage, ProviderError> {
        let candidate = match self.cache.get(external_id) {
            Some(cached) => cached,
            None => {
                let candidate = self.lookup_best(external_id, cancel).await?;
                self.cache.insert(external_id.to_string(), candidate.clone());
                candidate
            }
        };

        let Some(candidate) = candidate else {
            return Err(ProviderError::NotFound);
        };

        debug!(
            target: "fanarttv",
            external_id,
            url = %candidate.url,
            likes = candidate.likes,
            "downloading artist image"
        );
        self.download(&candidate.url, cancel).await
    }

    async fn lookup_best(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ImageCandidate>, ProviderError> {
        self.rate_limiter
            .wait(cancel)
            .await
            .map_err(|_| ProviderError::Cancelled)?;

        let url = format!("{}/{}?api_key={}", self.base_url, external_id, self.api_key);
        debug!(target: "fanarttv", external_id, "fetching artist image metadata");

        let request = self.client.get(&url).send();
        let response = tokio::select! {
            response = request => response?,
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, message));
        }

        let body = tokio::select! {
            body = response.text() => body?,
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
        };
        let images: ArtistImagesResponse = serde_json::from_str(&body)?;

        // Thumbs are purpose-made portraits; backgrounds only fill in when
        // no thumb exists at all.
        let best = pick_most_liked(&images.thumbs)
            .or_else(|| pick_most_liked(&images.backgrounds));
        Ok(best)
    }

    async fn download(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchedImage, ProviderError> {
        self.rate_limiter
            .wait(cancel)
            .await
            .map_err(|_| ProviderError::Cancelled)?;

        let request = self.client.get(url).send();
        let response = tokio::select! {
            response = request => response?,
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, message));
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

        Ok(FetchedImage { bytes, mime_type })
    }
}

fn pick_most_liked(items: &[ImageItem]) -> Option<ImageCandidate> {
    items
        .iter()
        .map(|item| ImageCandidate {
            url: item.url.clone(),
            likes: item
                .likes
                .as_deref()
                .and_then(|l| l.parse::<u32>().ok())
                .unwrap_or(0),
        })
        .max_by_key(|candidate| candidate.likes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_most_liked() {
        let items = vec![
            ImageItem {
                url: "a".into(),
                likes: Some("3".into()),
            },
            ImageItem {
                url: "b".into(),
                likes: Some("12".into()),
            },
            ImageItem {
                url: "c".into(),
                likes: None,
            },
        ];
        let best = pick_most_liked(&items).expect("candidate");
        assert_eq!(best.url, "b");
        assert_eq!(best.likes, 12);
    }

    #[test]
    fn test_pick_most_liked_empty() {
        assert_eq!(pick_most_liked(&[]), None);
    }
}
