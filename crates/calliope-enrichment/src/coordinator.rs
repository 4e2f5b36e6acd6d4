// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{anyhow, Result};
use calliope_domain::{EnrichmentJob, JobKind};
use calliope_store::CacheStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::providers::IdentifierService;

/// Seeds the durable job queue from catalog entries that lack artwork.
/// Each seeding operation is guarded by its own in-flight flag: a second
/// call while one is running returns immediately.
pub struct EnrichmentCoordinator {
    store: CacheStore,
    identifier: Arc<dyn IdentifierService>,
    albums_running: AtomicBool,
    artists_running: AtomicBool,
}

impl EnrichmentCoordinator {
    pub fn new(store: CacheStore, identifier: Arc<dyn IdentifierService>) -> Self {
        Self {
            store,
            identifier,
            albums_running: AtomicBool::new(false),
            artists_running: AtomicBool::new(false),
        }
    }

    /// Queue an `album_art` job for every album without artwork whose
    /// identifier lookup resolves. Returns the number of jobs queued.
    pub async fn queue_missing_artwork(&self, cancel: &CancellationToken) -> Result<u64> {
        if self.albums_running.swap(true, Ordering::SeqCst) {
            debug!(target: "enrichment", "album seeding already running");
            return Ok(0);
        }
        let result = self.seed_albums(cancel).await;
        self.albums_running.store(false, Ordering::SeqCst);
        result
    }

    /// Queue an `artist_art` job for every artist without an image. The
    /// identifier lookup is best-effort: the job is queued even without an
    /// external id because the fallback chain can search by name.
    pub async fn queue_missing_artist_images(&self, cancel: &CancellationToken) -> Result<u64> {
        if self.artists_running.swap(true, Ordering::SeqCst) {
            debug!(target: "enrichment", "artist seeding already running");
            return Ok(0);
        }
        let result = self.seed_artists(cancel).await;
        self.artists_running.store(false, Ordering::SeqCst);
        result
    }

    async fn seed_albums(&self, cancel: &CancellationToken) -> Result<u64> {
        let albums = self.store.albums_missing_artwork().await?;
        info!(target: "enrichment", candidates = albums.len(), "seeding album art jobs");

        let mut queued = 0u64;
        for album in &albums {
            if cancel.is_cancelled() {
                return Err(anyhow!("album seeding cancelled"));
            }

            let external_id = match self
                .identifier
                .find_release_id(&album.album_artist, &album.title, cancel)
                .await
            {
                Ok(Some(id)) => id,
                Ok(None) => {
                    debug!(
                        target: "enrichment",
                        album_id = %album.id,
                        title = %album.title,
                        "no identifier match; skipping"
                    );
                    continue;
                }
                Err(error) => {
                    warn!(
                        target: "enrichment",
                        album_id = %album.id,
                        title = %album.title,
                        %error,
                        "identifier lookup failed; skipping"
                    );
                    continue;
                }
            };

            let job = EnrichmentJob::new(JobKind::AlbumArt, &album.id, &album.title, external_id);
            self.store.add_job(&job).await?;
            queued += 1;
        }

        info!(target: "enrichment", queued, "album art jobs queued");
        Ok(queued)
    }

    async fn seed_artists(&self, cancel: &CancellationToken) -> Result<u64> {
        let artists = self.store.artists_missing_artwork().await?;
        info!(target: "enrichment", candidates = artists.len(), "seeding artist image jobs");

        let mut queued = 0u64;
        for artist in &artists {
            if cancel.is_cancelled() {
                return Err(anyhow!("artist seeding cancelled"));
            }

            let external_id = match self.identifier.find_artist_id(&artist.name, cancel).await {
                Ok(Some(id)) => id,
                Ok(None) => String::new(),
                Err(error) => {
                    warn!(
                        target: "enrichment",
                        artist = %artist.name,
                        %error,
                        "identifier lookup failed; queueing without external id"
                    );
                    String::new()
                }
            };

            let job = EnrichmentJob::new(JobKind::ArtistArt, &artist.id, &artist.name, external_id);
            self.store.add_job(&job).await?;
            queued += 1;
        }

        info!(target: "enrichment", queued, "artist image jobs queued");
        Ok(queued)
    }
}
