// SPDX-License-Identifier: GPL-3.0-or-later

use calliope_musicbrainz::RateLimiter;
use moka::sync::Cache;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ProviderError;

const DEEZER_BASE: &str = "https://api.deezer.com";

/// Provider tag recorded on artist rows filled from this client.
pub const DEEZER_SOURCE: &str = "deezer";

/// Hotlinkable artist image found by name search. Deezer's terms do not
/// allow caching the image to disk, so only the URL travels onward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeezerArtistImage {
    pub url: String,
    pub artist_name: String,
}

/// Fallback artist-image provider: searches by name, no auth, hotlink only.
pub struct DeezerClient {
    client: Client,
    rate_limiter: RateLimiter,
    cache: Cache<String, Option<DeezerArtistImage>>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<ArtistResult>,
}

#[derive(Debug, Deserialize)]
struct ArtistResult {
    name: String,
    picture_xl: Option<String>,
    picture_big: Option<String>,
    picture_medium: Option<String>,
    picture_small: Option<String>,
    picture: Option<String>,
}

impl DeezerClient {
    pub fn new(base_url: Option<String>) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            // 50 requests per 5 seconds upstream; stay well under it
            rate_limiter: RateLimiter::per_second(5.0),
            cache: Cache::new(10_000),
            base_url: base_url
                .unwrap_or_else(|| DEEZER_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    /// Search for an artist by name and return the best image URL. Names
    /// must match case-insensitively, exactly or as a substring.
    pub async fn search_artist_image(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<DeezerArtistImage, ProviderError> {
        let key = name.to_lowercase();
        if let Some(cached) = self.cache.get(&key) {
            return cached.ok_or(ProviderError::NotFound);
        }

        self.rate_limiter
            .wait(cancel)
            .await
            .map_err(|_| ProviderError::Cancelled)?;

        let url = format!("{}/search/artist", self.base_url);
        debug!(target: "deezer", artist = name, "searching artist image");

        let request = self
            .client
            .get(&url)
            .query(&[("q", name), ("limit", "5")])
            .send();
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
        let results: SearchResponse = serde_json::from_str(&body)?;

        let image = select_match(name, &results.data);
        self.cache.insert(key, image.clone());
        image.ok_or(ProviderError::NotFound)
    }
}

fn select_match(query: &str, results: &[ArtistResult]) -> Option<DeezerArtistImage> {
    let query_lower = query.to_lowercase();

    let exact = results
        .iter()
        .find(|r| r.name.to_lowercase() == query_lower);
    let substring = || {
        results.iter().find(|r| {
            let name_lower = r.name.to_lowercase();
            name_lower.contains(&query_lower) || query_lower.contains(&name_lower)
        })
    };

    let result = exact.or_else(substring)?;
    let url = best_picture(result)?;
    Some(DeezerArtistImage {
        url,
        artist_name: result.name.clone(),
    })
}

fn best_picture(result: &ArtistResult) -> Option<String> {
    [
        &result.picture_xl,
        &result.picture_big,
        &result.picture_medium,
        &result.picture_small,
        &result.picture,
    ]
    .into_iter()
    .flatten()
    .find(|url| !url.is_empty())
    .cloned()
}
