// SPDX-License-Identifier: GPL-3.0-or-later

//! Direct-from-daemon read path: the cold-start and degraded-mode twin of
//! the cached queries, with filtering, sorting and pagination in memory.

use anyhow::Result;
use calliope_domain::{
    Album, AlbumFilter, AlbumScope, AlbumSort, Artist, Page, RadioStation, Track,
};
use std::cmp::Ordering;
use std::sync::Arc;

use crate::builder::{album_from_row, is_radio_name, track_from_row};
use crate::provider::{keys, CatalogProvider};
use crate::source::SourceResolver;

pub(crate) async fn albums(
    provider: &Arc<dyn CatalogProvider>,
    classifier: &SourceResolver,
    base_paths: &[String],
    filter: &AlbumFilter,
    sort: AlbumSort,
    page: Page,
) -> Result<(Vec<Album>, u64)> {
    let mut albums: Vec<Album> = Vec::new();
    for base_path in base_paths {
        let rows = provider.album_details(base_path).await?;
        albums.extend(rows.iter().filter_map(|row| album_from_row(row, classifier)));
    }

    albums.retain(|album| matches_filter(album, filter));
    sort_albums(&mut albums, sort);

    let total = albums.len() as u64;
    Ok((paginate(albums, page), total))
}

pub(crate) async fn artists(
    provider: &Arc<dyn CatalogProvider>,
    query: Option<&str>,
    page: Page,
) -> Result<(Vec<Artist>, u64)> {
    let counts = provider.artist_album_counts().await?;

    let query_lower = query.map(|q| q.to_lowercase());
    let mut artists: Vec<Artist> = counts
        .into_iter()
        .filter(|(name, _)| !name.is_empty())
        .filter(|(name, _)| match &query_lower {
            Some(q) => name.to_lowercase().starts_with(q.as_str()),
            None => true,
        })
        .map(|(name, album_count)| {
            let mut artist = Artist::new(name);
            artist.album_count = album_count;
            artist
        })
        .collect();
    artists.sort_by(|a, b| cmp_nocase(&a.name, &b.name));

    let total = artists.len() as u64;
    Ok((paginate(artists, page), total))
}

pub(crate) async fn stations(
    provider: &Arc<dyn CatalogProvider>,
    query: Option<&str>,
    page: Page,
) -> Result<(Vec<RadioStation>, u64)> {
    let playlists = provider.playlists().await?;

    let mut stations = Vec::new();
    for playlist in playlists.iter().filter(|name| is_radio_name(name)) {
        let rows = provider.playlist_info(playlist).await?;
        let Some(uri) = rows.first().and_then(|row| row.get(keys::FILE)) else {
            continue;
        };
        let display_name = playlist.strip_prefix("Radio/").unwrap_or(playlist);
        stations.push(RadioStation::new(display_name, uri.clone()));
    }

    if let Some(query) = query.filter(|q| !q.is_empty()) {
        let query_lower = query.to_lowercase();
        stations.retain(|station| {
            station.name.to_lowercase().contains(&query_lower)
                || station
                    .genre
                    .as_ref()
                    .is_some_and(|g| g.to_lowercase().contains(&query_lower))
        });
    }
    stations.sort_by(|a, b| cmp_nocase(&a.name, &b.name));

    let total = stations.len() as u64;
    Ok((paginate(stations, page), total))
}

pub(crate) async fn album_tracks(
    provider: &Arc<dyn CatalogProvider>,
    classifier: &SourceResolver,
    album_id: &str,
    album: &str,
    album_artist: &str,
) -> Result<Vec<Track>> {
    let rows = provider.album_tracks(album, album_artist).await?;
    let mut tracks: Vec<Track> = rows
        .iter()
        .filter_map(|row| track_from_row(row, album_id, album_artist, classifier))
        .collect();
    tracks.sort_by(|a, b| {
        a.disc_number
            .cmp(&b.disc_number)
            .then(a.track_number.cmp(&b.track_number))
    });
    Ok(tracks)
}

fn matches_filter(album: &Album, filter: &AlbumFilter) -> bool {
    let scope_ok = match filter.scope {
        AlbumScope::All => true,
        AlbumScope::Nas => album.source == calliope_domain::SourceClass::Nas,
        AlbumScope::Local => album.source.is_local(),
        AlbumScope::Usb => album.source == calliope_domain::SourceClass::Usb,
    };
    if !scope_ok {
        return false;
    }

    if let Some(query) = filter.query.as_deref().filter(|q| !q.is_empty()) {
        let query_lower = query.to_lowercase();
        if !album.title.to_lowercase().contains(&query_lower)
            && !album.album_artist.to_lowercase().contains(&query_lower)
        {
            return false;
        }
    }

    if let Some(artist) = filter.artist.as_deref().filter(|a| !a.is_empty()) {
        if album.album_artist != artist {
            return false;
        }
    }

    true
}

/// Mirrors the store's ORDER BY clauses, tie-breakers included.
pub(crate) fn sort_albums(albums: &mut [Album], sort: AlbumSort) {
    match sort {
        AlbumSort::Alphabetical => albums.sort_by(|a, b| {
            cmp_nocase(&a.title, &b.title)
                .then_with(|| cmp_nocase(&a.album_artist, &b.album_artist))
                .then_with(|| a.id.cmp(&b.id))
        }),
        AlbumSort::ByArtist => albums.sort_by(|a, b| {
            cmp_nocase(&a.album_artist, &b.album_artist)
                .then_with(|| cmp_nocase(&a.title, &b.title))
                .then_with(|| a.id.cmp(&b.id))
        }),
        AlbumSort::RecentlyAdded => albums.sort_by(|a, b| {
            b.added_at
                .cmp(&a.added_at)
                .then_with(|| cmp_nocase(&a.title, &b.title))
                .then_with(|| a.id.cmp(&b.id))
        }),
        AlbumSort::Year => albums.sort_by(|a, b| {
            // None years last, like NULLs under DESC
            match (a.year, b.year) {
                (Some(ya), Some(yb)) => yb.cmp(&ya),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
            .then_with(|| cmp_nocase(&a.title, &b.title))
            .then_with(|| a.id.cmp(&b.id))
        }),
    }
}

fn cmp_nocase(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn paginate<T>(items: Vec<T>, page: Page) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect()
}
