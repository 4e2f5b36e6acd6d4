// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{MusicBrainzError, Result};
use crate::models::{ArtistSearchResponse, ReleaseSearchResponse, SearchQuery};
use crate::rate_limiter::RateLimiter;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

const MUSICBRAINZ_API_BASE: &str = "https://musicbrainz.org/ws/2";
const USER_AGENT: &str = concat!(
    "Calliope/",
    env!("CARGO_PKG_VERSION"),
    " ( https://github.com/calliope-audio/calliope )"
);

const SEARCH_LIMIT: u32 = 5;

/// Characters the identifier service's query grammar treats specially.
const LUCENE_SPECIALS: &[char] = &[
    '\\', '"', '+', '-', '!', '(', ')', '{', '}', '[', ']', '^', '~', '*', '?', ':', '/',
];

/// Backslash-escape untrusted values before embedding them in a search
/// query. `&&` and `||` are operators too, but escaping the individual
/// characters covers them.
pub fn lucene_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if LUCENE_SPECIALS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Identifier-service client with rate limiting.
#[derive(Debug, Clone)]
pub struct MusicBrainzClient {
    client: Client,
    base_url: String,
    user_agent: String,
    rate_limiter: RateLimiter,
}

impl MusicBrainzClient {
    /// Create a new client with default settings.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a client builder for custom configuration.
    pub fn builder() -> MusicBrainzClientBuilder {
        MusicBrainzClientBuilder::default()
    }

    /// Resolve `(artist, album)` to an external release id.
    ///
    /// Returns the first match scoring at least 80; failing that, the top
    /// match when it scores above 50; otherwise `None`.
    pub async fn find_release_id(
        &self,
        artist: &str,
        album: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let query = format!(
            "artist:\"{}\" AND release:\"{}\"",
            lucene_escape(artist),
            lucene_escape(album)
        );
        let url = self.search_url("release", &SearchQuery::new(query).limit(SEARCH_LIMIT))?;
        let response: ReleaseSearchResponse = self.get(url.as_str(), cancel).await?;

        let scored: Vec<(String, u32)> = response
            .releases
            .into_iter()
            .map(|m| (m.id, m.score.unwrap_or(0)))
            .collect();
        let selected = pick_best(&scored);
        debug!(
            target: "musicbrainz",
            artist,
            album,
            selected = selected.as_deref().unwrap_or("-"),
            "release lookup"
        );
        Ok(selected)
    }

    /// Resolve an artist name to an external artist id, with the same
    /// selection rule as [`find_release_id`](Self::find_release_id).
    pub async fn find_artist_id(
        &self,
        artist: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let query = format!("artist:\"{}\"", lucene_escape(artist));
        let url = self.search_url("artist", &SearchQuery::new(query).limit(SEARCH_LIMIT))?;
        let response: ArtistSearchResponse = self.get(url.as_str(), cancel).await?;

        let scored: Vec<(String, u32)> = response
            .artists
            .into_iter()
            .map(|m| (m.id, m.score.unwrap_or(0)))
            .collect();
        let selected = pick_best(&scored);
        debug!(
            target: "musicbrainz",
            artist,
            selected = selected.as_deref().unwrap_or("-"),
            "artist lookup"
        );
        Ok(selected)
    }

    fn search_url(&self, entity: &str, query: &SearchQuery) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, entity))
            .map_err(|e| MusicBrainzError::InvalidResponse(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("query", &query.query)
            .append_pair("fmt", "json");
        if let Some(limit) = query.limit {
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }
        Ok(url)
    }

    /// Rate-limited GET; aborts the in-flight request when the token fires.
    async fn get<T: DeserializeOwned>(&self, url: &str, cancel: &CancellationToken) -> Result<T> {
        self.rate_limiter
            .wait(cancel)
            .await
            .map_err(|_| MusicBrainzError::Cancelled)?;

        trace!(target: "musicbrainz", "GET {}", url);

        let request = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send();
        let response = tokio::select! {
            response = request => response?,
            _ = cancel.cancelled() => return Err(MusicBrainzError::Cancelled),
        };

        let status = response.status();
        debug!(target: "musicbrainz", "response status: {}", status);

        if status == 404 {
            return Err(MusicBrainzError::NotFound(url.to_string()));
        }

        if status == 429 || status == 503 {
            return Err(MusicBrainzError::RateLimited);
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MusicBrainzError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = tokio::select! {
            body = response.text() => body?,
            _ = cancel.cancelled() => return Err(MusicBrainzError::Cancelled),
        };
        trace!(target: "musicbrainz", "response body: {}", body);

        serde_json::from_str(&body).map_err(|e| {
            MusicBrainzError::InvalidResponse(format!("Failed to parse response: {}", e))
        })
    }
}

/// Selection rule over scored matches: first with score >= 80, else the top
/// score when above 50, else nothing.
pub(crate) fn pick_best(matches: &[(String, u32)]) -> Option<String> {
    if let Some((id, _)) = matches.iter().find(|(_, score)| *score >= 80) {
        return Some(id.clone());
    }
    matches
        .iter()
        .max_by_key(|(_, score)| *score)
        .filter(|(_, score)| *score > 50)
        .map(|(id, _)| id.clone())
}

/// Builder for configuring an identifier-service client.
#[derive(Debug)]
pub struct MusicBrainzClientBuilder {
    base_url: String,
    user_agent: String,
    timeout: Duration,
    rate_limit_interval: Duration,
}

impl Default for MusicBrainzClientBuilder {
    fn default() -> Self {
        Self {
            base_url: MUSICBRAINZ_API_BASE.to_string(),
            user_agent: USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            rate_limit_interval: Duration::from_secs(1),
        }
    }
}

impl MusicBrainzClientBuilder {
    /// Set a custom base URL (useful for testing with mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the User-Agent the upstream policy requires.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    /// Set request timeout duration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set rate limit interval between requests.
    pub fn rate_limit_interval(mut self, interval: Duration) -> Self {
        self.rate_limit_interval = interval;
        self
    }

    pub fn build(self) -> Result<MusicBrainzClient> {
        let client = Client::builder().timeout(self.timeout).build()?;
        let rate_limiter = RateLimiter::new(self.rate_limit_interval);

        Ok(MusicBrainzClient {
            client,
            base_url: self.base_url,
            user_agent: self.user_agent,
            rate_limiter,
        })
    }
}
