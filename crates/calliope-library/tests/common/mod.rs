use anyhow::{anyhow, Result};
use calliope_library::provider::{CatalogProvider, Row};
use std::collections::HashMap;
use std::sync::Mutex;

pub fn row(pairs: &[(&str, &str)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn album_row(album: &str, artist: &str, first_track: &str, year: &str) -> Row {
    row(&[
        ("album", album),
        ("albumartist", artist),
        ("firsttrack", first_track),
        ("trackcount", "10"),
        ("totaltime", "2400"),
        ("year", year),
    ])
}

pub fn track_row(file: &str, title: &str, track: &str, duration: &str) -> Row {
    row(&[
        ("file", file),
        ("title", title),
        ("track", track),
        ("duration", duration),
    ])
}

/// In-memory daemon stand-in. Mutexes let tests mutate the catalog between
/// calls to prove which path served a read.
#[derive(Default)]
pub struct FakeProvider {
    pub albums: Mutex<HashMap<String, Vec<Row>>>,
    pub artist_counts: Mutex<HashMap<String, u32>>,
    pub tracks: Mutex<HashMap<(String, String), Vec<Row>>>,
    pub playlists: Mutex<Vec<String>>,
    pub playlist_rows: Mutex<HashMap<String, Vec<Row>>>,
    pub fail_playlists: bool,
    pub fail_album_details: bool,
}

impl FakeProvider {
    pub fn set_albums(&self, base_path: &str, rows: Vec<Row>) {
        self.albums
            .lock()
            .unwrap()
            .insert(base_path.to_string(), rows);
    }

    pub fn set_artist_counts(&self, counts: &[(&str, u32)]) {
        *self.artist_counts.lock().unwrap() = counts
            .iter()
            .map(|(name, count)| (name.to_string(), *count))
            .collect();
    }

    pub fn set_tracks(&self, album: &str, artist: &str, rows: Vec<Row>) {
        self.tracks
            .lock()
            .unwrap()
            .insert((album.to_string(), artist.to_string()), rows);
    }

    pub fn add_playlist(&self, name: &str, rows: Vec<Row>) {
        self.playlists.lock().unwrap().push(name.to_string());
        self.playlist_rows
            .lock()
            .unwrap()
            .insert(name.to_string(), rows);
    }

    pub fn clear_everything(&self) {
        self.albums.lock().unwrap().clear();
        self.artist_counts.lock().unwrap().clear();
        self.tracks.lock().unwrap().clear();
        self.playlists.lock().unwrap().clear();
        self.playlist_rows.lock().unwrap().clear();
    }
}

#[async_trait::async_trait]
impl CatalogProvider for FakeProvider {
    async fn album_details(&self, base_path: &str) -> Result<Vec<Row>> {
        if self.fail_album_details {
            return Err(anyhow!("daemon connection refused"));
        }
        Ok(self
            .albums
            .lock()
            .unwrap()
            .get(base_path)
            .cloned()
            .unwrap_or_default())
    }

    async fn artist_album_counts(&self) -> Result<HashMap<String, u32>> {
        Ok(self.artist_counts.lock().unwrap().clone())
    }

    async fn album_tracks(&self, album: &str, album_artist: &str) -> Result<Vec<Row>> {
        Ok(self
            .tracks
            .lock()
            .unwrap()
            .get(&(album.to_string(), album_artist.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn playlists(&self) -> Result<Vec<String>> {
        if self.fail_playlists {
            return Err(anyhow!("playlist directory unavailable"));
        }
        Ok(self.playlists.lock().unwrap().clone())
    }

    async fn playlist_info(&self, name: &str) -> Result<Vec<Row>> {
        Ok(self
            .playlist_rows
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default())
    }
}
