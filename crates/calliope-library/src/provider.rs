// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::Result;
use std::collections::HashMap;

/// One untyped row from the playback daemon: tag names mapped to values.
pub type Row = HashMap<String, String>;

/// Keys the daemon adapter uses in the rows it returns. The cache builder
/// is the sole translator from these rows to typed entities.
pub mod keys {
    pub const ALBUM: &str = "album";
    pub const ALBUM_ARTIST: &str = "albumartist";
    pub const ARTIST: &str = "artist";
    pub const TITLE: &str = "title";
    pub const FILE: &str = "file";
    pub const TRACK: &str = "track";
    pub const DISC: &str = "disc";
    pub const DURATION: &str = "duration";
    pub const TIME: &str = "time";
    pub const YEAR: &str = "year";
    pub const TRACK_COUNT: &str = "trackcount";
    pub const FIRST_TRACK: &str = "firsttrack";
    pub const TOTAL_TIME: &str = "totaltime";
}

/// The narrow read-side view of the playback daemon's database that the
/// cache builder and the degraded-mode read path pull from.
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// One row per album under the given base path, carrying `album`,
    /// `albumartist`, `trackcount`, `firsttrack`, `totaltime` and `year`.
    async fn album_details(&self, base_path: &str) -> Result<Vec<Row>>;

    /// Album counts per artist name.
    async fn artist_album_counts(&self) -> Result<HashMap<String, u32>>;

    /// One row per track of the given album, carrying `title`, `artist`,
    /// `file`, `track`, `disc` and `duration`/`time`.
    async fn album_tracks(&self, album: &str, album_artist: &str) -> Result<Vec<Row>>;

    /// Names of all stored playlists.
    async fn playlists(&self) -> Result<Vec<String>>;

    /// Track rows of a stored playlist.
    async fn playlist_info(&self, name: &str) -> Result<Vec<Row>>;
}
