#![allow(dead_code)]

use anyhow::{anyhow, Result};
use calliope_artwork::{FetchedImage, ProviderError};
use calliope_enrichment::{
    AlbumArtSource, ArtistImageSearch, ArtistImageSource, IdentifierService,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub fn jpeg_image() -> FetchedImage {
    FetchedImage {
        bytes: vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4],
        mime_type: "image/jpeg".to_string(),
    }
}

/// Pops one scripted response per call; an exhausted script answers 404.
#[derive(Default)]
pub struct MockAlbumArt {
    pub responses: Mutex<VecDeque<Result<FetchedImage, ProviderError>>>,
    pub calls: AtomicUsize,
}

impl MockAlbumArt {
    pub fn scripted(
        responses: impl IntoIterator<Item = Result<FetchedImage, ProviderError>>,
    ) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl AlbumArtSource for MockAlbumArt {
    async fn fetch_album_art(
        &self,
        _external_id: &str,
        _cancel: &CancellationToken,
    ) -> Result<FetchedImage, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProviderError::NotFound))
    }
}

#[derive(Default)]
pub struct MockArtistImages {
    pub responses: Mutex<VecDeque<Result<FetchedImage, ProviderError>>>,
    pub calls: AtomicUsize,
}

impl MockArtistImages {
    pub fn scripted(
        responses: impl IntoIterator<Item = Result<FetchedImage, ProviderError>>,
    ) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl ArtistImageSource for MockArtistImages {
    async fn fetch_artist_image(
        &self,
        _external_id: &str,
        _cancel: &CancellationToken,
    ) -> Result<FetchedImage, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProviderError::NotFound))
    }
}

#[derive(Default)]
pub struct MockArtistSearch {
    pub responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    pub calls: AtomicUsize,
}

impl MockArtistSearch {
    pub fn scripted(responses: impl IntoIterator<Item = Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl ArtistImageSearch for MockArtistSearch {
    async fn search_artist_image(
        &self,
        _name: &str,
        _cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProviderError::NotFound))
    }
}

/// Identifier stub with a fixed answer table. An optional per-lookup delay
/// makes in-flight guard tests deterministic.
#[derive(Default)]
pub struct MockIdentifier {
    pub release_ids: Mutex<HashMap<String, Option<String>>>,
    pub artist_ids: Mutex<HashMap<String, Option<String>>>,
    pub fail_lookups: bool,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl MockIdentifier {
    pub fn with_release(mut self, album: &str, id: Option<&str>) -> Self {
        self.release_ids
            .get_mut()
            .unwrap()
            .insert(album.to_string(), id.map(String::from));
        self
    }

    pub fn with_artist(mut self, name: &str, id: Option<&str>) -> Self {
        self.artist_ids
            .get_mut()
            .unwrap()
            .insert(name.to_string(), id.map(String::from));
        self
    }
}

#[async_trait::async_trait]
impl IdentifierService for MockIdentifier {
    async fn find_release_id(
        &self,
        _artist: &str,
        album: &str,
        _cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_lookups {
            return Err(anyhow!("identifier service unreachable"));
        }
        Ok(self
            .release_ids
            .lock()
            .unwrap()
            .get(album)
            .cloned()
            .flatten())
    }

    async fn find_artist_id(
        &self,
        name: &str,
        _cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_lookups {
            return Err(anyhow!("identifier service unreachable"));
        }
        Ok(self.artist_ids.lock().unwrap().get(name).cloned().flatten())
    }
}
