// SPDX-License-Identifier: GPL-3.0-or-later

//! Capability traits the pipeline is polymorphic over, and their
//! implementations for the concrete provider clients.

use anyhow::Result;
use calliope_artwork::{CoverArtClient, DeezerClient, FanartTvClient, FetchedImage, ProviderError};
use calliope_musicbrainz::MusicBrainzClient;
use tokio_util::sync::CancellationToken;

/// Resolves catalog names to the external ids the artwork providers accept.
#[async_trait::async_trait]
pub trait IdentifierService: Send + Sync {
    async fn find_release_id(
        &self,
        artist: &str,
        album: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>>;

    async fn find_artist_id(&self, name: &str, cancel: &CancellationToken)
        -> Result<Option<String>>;
}

#[async_trait::async_trait]
impl IdentifierService for MusicBrainzClient {
    async fn find_release_id(
        &self,
        artist: &str,
        album: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        Ok(MusicBrainzClient::find_release_id(self, artist, album, cancel).await?)
    }

    async fn find_artist_id(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        Ok(MusicBrainzClient::find_artist_id(self, name, cancel).await?)
    }
}

/// Primary album-cover source: bytes by external id.
#[async_trait::async_trait]
pub trait AlbumArtSource: Send + Sync {
    async fn fetch_album_art(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchedImage, ProviderError>;
}

#[async_trait::async_trait]
impl AlbumArtSource for CoverArtClient {
    async fn fetch_album_art(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchedImage, ProviderError> {
        self.fetch_front(external_id, cancel).await
    }
}

/// Preferred artist-image source: bytes by external id, kept locally.
#[async_trait::async_trait]
pub trait ArtistImageSource: Send + Sync {
    async fn fetch_artist_image(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchedImage, ProviderError>;
}

#[async_trait::async_trait]
impl ArtistImageSource for FanartTvClient {
    async fn fetch_artist_image(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchedImage, ProviderError> {
        FanartTvClient::fetch_artist_image(self, external_id, cancel).await
    }
}

/// Fallback artist-image source: name search yielding a hotlinkable URL
/// that is never cached to disk.
#[async_trait::async_trait]
pub trait ArtistImageSearch: Send + Sync {
    async fn search_artist_image(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError>;
}

#[async_trait::async_trait]
impl ArtistImageSearch for DeezerClient {
    async fn search_artist_image(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        DeezerClient::search_artist_image(self, name, cancel)
            .await
            .map(|image| image.url)
    }
}
