// SPDX-License-Identifier: GPL-3.0-or-later

//! Response shapes served to the HTTP façade. Reads degrade to empty lists;
//! only the album-tracks endpoint carries an error field.

use calliope_domain::{Album, Artist, Page, RadioStation, SourceClass, Track};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(page: Page, returned: usize, total: u64) -> Self {
        Self {
            page: page.page,
            limit: page.limit,
            total,
            has_more: (page.offset() as u64) + (returned as u64) < total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlbumSummary {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub uri: String,
    pub source: SourceClass,
    pub year: Option<i32>,
    pub track_count: u32,
    pub duration_secs: u32,
    pub artwork_id: Option<String>,
}

impl From<&Album> for AlbumSummary {
    fn from(album: &Album) -> Self {
        Self {
            id: album.id.clone(),
            title: album.title.clone(),
            artist: album.album_artist.clone(),
            uri: album.uri.clone(),
            source: album.source,
            year: album.year,
            track_count: album.track_count,
            duration_secs: album.total_duration_secs,
            artwork_id: album.artwork_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlbumsResponse {
    pub albums: Vec<AlbumSummary>,
    pub pagination: Pagination,
}

impl AlbumsResponse {
    pub fn empty(page: Page) -> Self {
        Self {
            albums: Vec::new(),
            pagination: Pagination::new(page, 0, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
    pub album_count: u32,
    pub artwork_id: Option<String>,
}

impl From<&Artist> for ArtistSummary {
    fn from(artist: &Artist) -> Self {
        Self {
            id: artist.id.clone(),
            name: artist.name.clone(),
            album_count: artist.album_count,
            artwork_id: artist.artwork_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistsResponse {
    pub artists: Vec<ArtistSummary>,
    pub pagination: Pagination,
}

impl ArtistsResponse {
    pub fn empty(page: Page) -> Self {
        Self {
            artists: Vec::new(),
            pagination: Pagination::new(page, 0, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistAlbumsResponse {
    pub artist: String,
    pub albums: Vec<AlbumSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSummary {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub uri: String,
    pub track_number: u32,
    pub disc_number: u32,
    pub duration_secs: f64,
    pub source: SourceClass,
}

impl From<&Track> for TrackSummary {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            uri: track.uri.clone(),
            track_number: track.track_number,
            disc_number: track.disc_number,
            duration_secs: track.duration_secs,
            source: track.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlbumTracksResponse {
    pub tracks: Vec<TrackSummary>,
    pub total_duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AlbumTracksResponse {
    pub fn from_tracks(tracks: &[Track]) -> Self {
        Self {
            total_duration_secs: tracks.iter().map(|t| t.duration_secs).sum(),
            tracks: tracks.iter().map(TrackSummary::from).collect(),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            tracks: Vec::new(),
            total_duration_secs: 0.0,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationSummary {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub icon: Option<String>,
    pub genre: Option<String>,
}

impl From<&RadioStation> for StationSummary {
    fn from(station: &RadioStation) -> Self {
        Self {
            id: station.id.clone(),
            name: station.name.clone(),
            uri: station.uri.clone(),
            icon: station.icon.clone(),
            genre: station.genre.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationsResponse {
    pub stations: Vec<StationSummary>,
    pub pagination: Pagination,
}

impl StationsResponse {
    pub fn empty(page: Page) -> Self {
        Self {
            stations: Vec::new(),
            pagination: Pagination::new(page, 0, 0),
        }
    }
}
