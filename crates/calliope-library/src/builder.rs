// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{Context, Result};
use calliope_domain::{Album, Artist, RadioStation, SourceClass, Track};
use calliope_store::CacheStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::provider::{keys, CatalogProvider, Row};
use crate::source::SourceResolver;

const RADIO_PREFIX: &str = "Radio/";

/// Orchestrates full rebuilds of the library cache from the playback
/// daemon, and fills in album tracks on demand.
pub struct CacheBuilder {
    store: CacheStore,
    provider: Arc<dyn CatalogProvider>,
    classifier: Arc<SourceResolver>,
    base_paths: Vec<String>,
}

impl CacheBuilder {
    pub fn new(
        store: CacheStore,
        provider: Arc<dyn CatalogProvider>,
        classifier: Arc<SourceResolver>,
        base_paths: Vec<String>,
    ) -> Self {
        Self {
            store,
            provider,
            classifier,
            base_paths,
        }
    }

    /// Rebuild the whole catalog: truncate, then repopulate albums, artists
    /// and radio stations. Artwork rows are left in place so covers survive
    /// rebuilds. Album- and artist-phase failures abort the build; the
    /// radio phase is best-effort.
    pub async fn full_build(&self) -> Result<()> {
        self.store.set_building(true);
        self.store.set_build_progress(0);
        let result = self.run_build().await;
        self.store.set_building(false);
        result
    }

    async fn run_build(&self) -> Result<()> {
        info!(target: "builder", "starting full cache build");

        self.store
            .clear_catalog()
            .await
            .context("clearing catalog tables")?;
        self.store.set_build_progress(10);

        self.build_albums().await.context("album phase")?;
        self.store.set_build_progress(50);

        self.build_artists().await.context("artist phase")?;
        self.store.set_build_progress(80);

        // A missing playlist directory must not fail the whole build.
        if let Err(error) = self.build_radio_stations().await {
            warn!(target: "builder", %error, "radio station phase failed; continuing");
        }
        self.store.set_build_progress(95);

        // Artwork outlives the truncate; point the fresh rows back at it.
        let relinked = self.store.relink_artwork().await?;
        if relinked > 0 {
            debug!(target: "builder", relinked, "existing artwork relinked");
        }

        self.store.mark_build_complete().await?;
        self.store.set_build_progress(100);
        info!(target: "builder", "full cache build complete");
        Ok(())
    }

    async fn build_albums(&self) -> Result<()> {
        let path_count = self.base_paths.len().max(1);
        for (index, base_path) in self.base_paths.iter().enumerate() {
            let rows = self
                .provider
                .album_details(base_path)
                .await
                .with_context(|| format!("album details for {}", base_path))?;
            debug!(target: "builder", base_path = %base_path, rows = rows.len(), "album rows fetched");

            let mut tx = self.store.begin().await?;
            let mut written = 0usize;
            for row in &rows {
                let Some(album) = album_from_row(row, &self.classifier) else {
                    continue;
                };
                match self.store.upsert_album_tx(&mut tx, &album).await {
                    Ok(()) => written += 1,
                    Err(error) => {
                        // A partial build beats a failed one.
                        warn!(
                            target: "builder",
                            album_id = %album.id,
                            title = %album.title,
                            %error,
                            "album row skipped"
                        );
                    }
                }
            }
            tx.commit().await?;
            info!(target: "builder", base_path = %base_path, written, "albums written");

            let progress = 10 + (40 * (index + 1) / path_count) as u8;
            self.store.set_build_progress(progress);
        }
        Ok(())
    }

    async fn build_artists(&self) -> Result<()> {
        let counts = self
            .provider
            .artist_album_counts()
            .await
            .context("artist album counts")?;

        let mut tx = self.store.begin().await?;
        let mut written = 0usize;
        for (name, album_count) in &counts {
            if name.is_empty() {
                continue;
            }
            let mut artist = Artist::new(name.clone());
            artist.album_count = *album_count;
            match self.store.upsert_artist_tx(&mut tx, &artist).await {
                Ok(()) => written += 1,
                Err(error) => {
                    warn!(target: "builder", artist = %name, %error, "artist row skipped");
                }
            }
        }
        tx.commit().await?;
        info!(target: "builder", written, "artists written");
        Ok(())
    }

    async fn build_radio_stations(&self) -> Result<()> {
        let playlists = self.provider.playlists().await.context("listing playlists")?;
        let radio_playlists: Vec<&String> = playlists.iter().filter(|n| is_radio_name(n)).collect();

        let mut tx = self.store.begin().await?;
        let mut written = 0usize;
        for playlist in radio_playlists {
            let rows = match self.provider.playlist_info(playlist).await {
                Ok(rows) => rows,
                Err(error) => {
                    warn!(target: "builder", playlist = %playlist, %error, "playlist unreadable");
                    continue;
                }
            };
            let Some(uri) = rows.first().and_then(|row| row.get(keys::FILE)).cloned() else {
                debug!(target: "builder", playlist = %playlist, "playlist has no stream uri");
                continue;
            };
            let display_name = playlist.strip_prefix(RADIO_PREFIX).unwrap_or(playlist);
            let station = RadioStation::new(display_name, uri);
            match self.store.upsert_station_tx(&mut tx, &station).await {
                Ok(()) => written += 1,
                Err(error) => {
                    warn!(target: "builder", station = %station.name, %error, "station row skipped");
                }
            }
        }
        tx.commit().await?;
        info!(target: "builder", written, "radio stations written");
        Ok(())
    }

    /// Write all tracks of one album in a single transaction. Called by the
    /// read service when an album's tracks are first requested.
    pub async fn build_album_tracks(
        &self,
        album_id: &str,
        album: &str,
        album_artist: &str,
    ) -> Result<usize> {
        let rows = self
            .provider
            .album_tracks(album, album_artist)
            .await
            .with_context(|| format!("tracks for {} / {}", album_artist, album))?;

        let mut tx = self.store.begin().await?;
        let mut written = 0usize;
        for row in &rows {
            let Some(track) = track_from_row(row, album_id, album_artist, &self.classifier) else {
                continue;
            };
            match self.store.upsert_track_tx(&mut tx, &track).await {
                Ok(()) => written += 1,
                Err(error) => {
                    warn!(target: "builder", uri = %track.uri, %error, "track row skipped");
                }
            }
        }
        tx.commit().await?;
        debug!(target: "builder", album_id, written, "album tracks cached");
        Ok(written)
    }
}

/// Playlists that represent radio stations: under `Radio/`, or named
/// `radio...` in any case.
pub(crate) fn is_radio_name(name: &str) -> bool {
    name.starts_with(RADIO_PREFIX) || name.to_lowercase().starts_with("radio")
}

/// Translate a daemon album row. Rows with an empty album name are noise
/// from untagged files and are skipped.
pub(crate) fn album_from_row(row: &Row, classifier: &SourceResolver) -> Option<Album> {
    let title = row.get(keys::ALBUM)?.trim();
    if title.is_empty() {
        return None;
    }
    let album_artist = row
        .get(keys::ALBUM_ARTIST)
        .or_else(|| row.get(keys::ARTIST))
        .map(|s| s.trim())
        .unwrap_or("");

    let first_track = row.get(keys::FIRST_TRACK).cloned().unwrap_or_default();

    let mut album = Album::new(album_artist, title);
    album.uri = parent_directory(&first_track);
    album.first_track_uri = first_track.clone();
    album.track_count = parse_u32(row.get(keys::TRACK_COUNT));
    album.total_duration_secs = parse_u32(row.get(keys::TOTAL_TIME));
    album.source = if first_track.is_empty() {
        SourceClass::Unknown
    } else {
        classifier.classify(&first_track)
    };
    album.year = row.get(keys::YEAR).and_then(|y| parse_year(y));
    album.added_at = Utc::now().timestamp();
    Some(album)
}

pub(crate) fn track_from_row(
    row: &Row,
    album_id: &str,
    album_artist: &str,
    classifier: &SourceResolver,
) -> Option<Track> {
    let uri = row.get(keys::FILE)?.clone();
    if uri.is_empty() {
        return None;
    }

    let title = row
        .get(keys::TITLE)
        .cloned()
        .unwrap_or_else(|| basename(&uri).to_string());
    let artist = row
        .get(keys::ARTIST)
        .cloned()
        .unwrap_or_else(|| album_artist.to_string());

    Some(Track {
        id: calliope_domain::track_id(&uri),
        album_id: album_id.to_string(),
        title,
        artist,
        source: classifier.classify(&uri),
        track_number: parse_position(row.get(keys::TRACK)).unwrap_or(0),
        disc_number: parse_position(row.get(keys::DISC)).unwrap_or(1),
        duration_secs: parse_duration(row),
        uri,
    })
}

/// Duration: float `duration` seconds, else integer `time` seconds, else 0.
pub(crate) fn parse_duration(row: &Row) -> f64 {
    if let Some(duration) = row.get(keys::DURATION).and_then(|d| d.parse::<f64>().ok()) {
        return duration;
    }
    row.get(keys::TIME)
        .and_then(|t| t.parse::<u64>().ok())
        .map(|t| t as f64)
        .unwrap_or(0.0)
}

/// Positions arrive as `"7"` or `"7/12"`.
pub(crate) fn parse_position(value: Option<&String>) -> Option<u32> {
    value?
        .split('/')
        .next()?
        .trim()
        .parse::<u32>()
        .ok()
}

fn parse_u32(value: Option<&String>) -> u32 {
    value
        .and_then(|v| v.parse::<f64>().ok())
        .map(|v| v.max(0.0) as u32)
        .unwrap_or(0)
}

/// Dates arrive as `"1997"` or `"1997-05-21"`.
pub(crate) fn parse_year(value: &str) -> Option<i32> {
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() == 4 {
        digits.parse().ok()
    } else {
        None
    }
}

pub(crate) fn parent_directory(uri: &str) -> String {
    match uri.rsplit_once('/') {
        Some((parent, _)) => parent.to_string(),
        None => String::new(),
    }
}

fn basename(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}
