// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};

/// Release (album) match returned by the search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseMatch {
    /// External release id other providers accept as input.
    pub id: String,
    pub title: Option<String>,
    /// Relevance score 0-100; only present in search results.
    #[serde(default)]
    pub score: Option<u32>,
}

/// Artist match returned by the search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistMatch {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub score: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ReleaseSearchResponse {
    #[serde(default)]
    pub releases: Vec<ReleaseMatch>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ArtistSearchResponse {
    #[serde(default)]
    pub artists: Vec<ArtistMatch>,
}

/// Search query parameters.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub query: String,
    pub limit: Option<u32>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: None,
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}
