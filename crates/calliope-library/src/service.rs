// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{anyhow, Result};
use calliope_domain::{AlbumFilter, AlbumSort, CacheStats, Page};
use calliope_store::CacheStore;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::builder::CacheBuilder;
use crate::direct;
use crate::provider::CatalogProvider;
use crate::responses::{
    AlbumSummary, AlbumTracksResponse, AlbumsResponse, ArtistAlbumsResponse, ArtistsResponse,
    Pagination, StationSummary, StationsResponse,
};
use crate::source::SourceResolver;

/// Catalog read API. Prefers the cache; any empty table or store error
/// degrades that read to the direct-from-daemon path.
pub struct LibraryService {
    provider: Arc<dyn CatalogProvider>,
    classifier: Arc<SourceResolver>,
    store: Option<CacheStore>,
    builder: Option<CacheBuilder>,
    base_paths: Vec<String>,
}

impl LibraryService {
    pub fn new(
        provider: Arc<dyn CatalogProvider>,
        classifier: Arc<SourceResolver>,
        store: Option<CacheStore>,
        base_paths: Vec<String>,
    ) -> Self {
        let builder = store.as_ref().map(|store| {
            CacheBuilder::new(
                store.clone(),
                provider.clone(),
                classifier.clone(),
                base_paths.clone(),
            )
        });
        Self {
            provider,
            classifier,
            store,
            builder,
            base_paths,
        }
    }

    pub fn cache_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub async fn cache_status(&self) -> CacheStats {
        match &self.store {
            Some(store) => store.stats().await.unwrap_or_else(|error| {
                warn!(target: "library", %error, "cache stats unavailable");
                CacheStats::default()
            }),
            None => CacheStats::default(),
        }
    }

    /// Run a full rebuild. Fatal phase failures propagate to the caller.
    pub async fn rebuild_cache(&self) -> Result<()> {
        match &self.builder {
            Some(builder) => builder.full_build().await,
            None => Err(anyhow!("cache is disabled")),
        }
    }

    pub async fn get_albums(
        &self,
        filter: &AlbumFilter,
        sort: AlbumSort,
        page: Page,
    ) -> AlbumsResponse {
        if let Some(store) = self.cache_ready(|stats| stats.albums > 0).await {
            match store.query_albums(filter, sort, page).await {
                Ok((albums, total)) => {
                    return AlbumsResponse {
                        pagination: Pagination::new(page, albums.len(), total),
                        albums: albums.iter().map(AlbumSummary::from).collect(),
                    };
                }
                Err(error) => {
                    warn!(target: "library", %error, "album cache query failed; using daemon");
                }
            }
        }

        match direct::albums(
            &self.provider,
            &self.classifier,
            &self.base_paths,
            filter,
            sort,
            page,
        )
        .await
        {
            Ok((albums, total)) => AlbumsResponse {
                pagination: Pagination::new(page, albums.len(), total),
                albums: albums.iter().map(AlbumSummary::from).collect(),
            },
            Err(error) => {
                warn!(target: "library", %error, "daemon album listing failed");
                AlbumsResponse::empty(page)
            }
        }
    }

    pub async fn get_artists(&self, query: Option<&str>, page: Page) -> ArtistsResponse {
        if let Some(store) = self.cache_ready(|stats| stats.artists > 0).await {
            match store.query_artists(query, page).await {
                Ok((artists, total)) => {
                    return ArtistsResponse {
                        pagination: Pagination::new(page, artists.len(), total),
                        artists: artists.iter().map(Into::into).collect(),
                    };
                }
                Err(error) => {
                    warn!(target: "library", %error, "artist cache query failed; using daemon");
                }
            }
        }

        match direct::artists(&self.provider, query, page).await {
            Ok((artists, total)) => ArtistsResponse {
                pagination: Pagination::new(page, artists.len(), total),
                artists: artists.iter().map(Into::into).collect(),
            },
            Err(error) => {
                warn!(target: "library", %error, "daemon artist listing failed");
                ArtistsResponse::empty(page)
            }
        }
    }

    /// All albums credited to one album artist.
    pub async fn get_artist_albums(&self, artist: &str, sort: AlbumSort) -> ArtistAlbumsResponse {
        let filter = AlbumFilter {
            artist: Some(artist.to_string()),
            ..AlbumFilter::default()
        };
        let page = Page::new(1, calliope_domain::PAGE_LIMIT_MAX);
        let albums = self.get_albums(&filter, sort, page).await;
        ArtistAlbumsResponse {
            artist: artist.to_string(),
            albums: albums.albums,
        }
    }

    pub async fn get_album_tracks(&self, album: &str, album_artist: &str) -> AlbumTracksResponse {
        if album.trim().is_empty() {
            return AlbumTracksResponse::error("album name is required");
        }
        let album_id = calliope_domain::album_id(album_artist, album);

        if let Some(store) = self.store.as_ref() {
            match self.cached_album_tracks(store, &album_id, album, album_artist).await {
                Ok(Some(tracks)) => return tracks,
                Ok(None) => {}
                Err(error) => {
                    warn!(target: "library", %error, album, "track cache read failed; using daemon");
                }
            }
        }

        match direct::album_tracks(&self.provider, &self.classifier, &album_id, album, album_artist)
            .await
        {
            Ok(tracks) => AlbumTracksResponse::from_tracks(&tracks),
            Err(error) => {
                warn!(target: "library", %error, album, "daemon track listing failed");
                AlbumTracksResponse::error(error.to_string())
            }
        }
    }

    async fn cached_album_tracks(
        &self,
        store: &CacheStore,
        album_id: &str,
        album: &str,
        album_artist: &str,
    ) -> Result<Option<AlbumTracksResponse>> {
        let tracks = store.tracks_for_album(album_id).await?;
        if !tracks.is_empty() {
            return Ok(Some(AlbumTracksResponse::from_tracks(&tracks)));
        }

        // Tracks are cached lazily, on the first request for the album.
        let Some(builder) = self.builder.as_ref() else {
            return Ok(None);
        };
        if store.get_album(album_id).await?.is_none() {
            return Ok(None);
        }
        let written = builder
            .build_album_tracks(album_id, album, album_artist)
            .await?;
        if written == 0 {
            return Ok(None);
        }
        debug!(target: "library", album_id, written, "album tracks cached on demand");
        let tracks = store.tracks_for_album(album_id).await?;
        Ok(Some(AlbumTracksResponse::from_tracks(&tracks)))
    }

    pub async fn get_radio_stations(&self, query: Option<&str>, page: Page) -> StationsResponse {
        if let Some(store) = self.cache_ready(|stats| stats.stations > 0).await {
            match store.query_stations(query, page).await {
                Ok((stations, total)) => {
                    return StationsResponse {
                        pagination: Pagination::new(page, stations.len(), total),
                        stations: stations.iter().map(StationSummary::from).collect(),
                    };
                }
                Err(error) => {
                    warn!(target: "library", %error, "station cache query failed; using daemon");
                }
            }
        }

        match direct::stations(&self.provider, query, page).await {
            Ok((stations, total)) => StationsResponse {
                pagination: Pagination::new(page, stations.len(), total),
                stations: stations.iter().map(StationSummary::from).collect(),
            },
            Err(error) => {
                warn!(target: "library", %error, "daemon station listing failed");
                StationsResponse::empty(page)
            }
        }
    }

    /// The store, when it is enabled, reachable, and populated for the
    /// relevant table. Anything else means the degraded daemon path.
    async fn cache_ready(&self, populated: fn(&CacheStats) -> bool) -> Option<&CacheStore> {
        let store = self.store.as_ref()?;
        match store.stats().await {
            Ok(stats) if populated(&stats) => Some(store),
            Ok(_) => {
                debug!(target: "library", "cache empty for this read; using daemon");
                None
            }
            Err(error) => {
                warn!(target: "library", %error, "cache stats failed; using daemon");
                None
            }
        }
    }
}
