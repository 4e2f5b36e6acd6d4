// SPDX-License-Identifier: GPL-3.0-or-later
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// Stable identifiers
// ============================================================================

/// Derive a stable identifier from key material.
///
/// The parts are joined with `'\0'` and hashed; the id is the lowercase hex
/// of the first 16 bytes of the SHA-256 digest. The same inputs always yield
/// the same id, which is what lets catalog rebuilds converge on identical
/// rows.
pub fn stable_id(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0u8]);
        }
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    digest[..16].iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn album_id(album_artist: &str, title: &str) -> String {
    stable_id(&[album_artist, title])
}

pub fn artist_id(name: &str) -> String {
    stable_id(&[name])
}

pub fn track_id(uri: &str) -> String {
    stable_id(&[uri])
}

pub fn artwork_id(owner_id: &str, kind: ArtworkKind) -> String {
    stable_id(&[owner_id, kind.as_str()])
}

pub fn station_id(name: &str, uri: &str) -> String {
    stable_id(&[name, uri])
}

/// SHA-256 hex digest of raw bytes, used as artwork content hash.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

// ============================================================================
// Source classification
// ============================================================================

/// Provenance class of a catalog URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceClass {
    Local,
    Usb,
    Nas,
    Mounted,
    Streaming,
    Unknown,
}

impl SourceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Usb => "usb",
            Self::Nas => "nas",
            Self::Mounted => "mounted",
            Self::Streaming => "streaming",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "local" => Self::Local,
            "usb" => Self::Usb,
            "nas" => Self::Nas,
            "mounted" => Self::Mounted,
            "streaming" => Self::Streaming,
            _ => Self::Unknown,
        }
    }

    /// The "local only" view keeps internal disk and removable media.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local | Self::Usb)
    }
}

impl std::fmt::Display for SourceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Catalog entities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub album_artist: String,
    /// Directory URI of the album within the daemon's namespace.
    pub uri: String,
    pub first_track_uri: String,
    pub track_count: u32,
    pub total_duration_secs: u32,
    pub source: SourceClass,
    pub year: Option<i32>,
    /// Seconds since the epoch; 0 means the daemon never reported one.
    pub added_at: i64,
    pub last_played_at: Option<i64>,
    pub artwork_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Album {
    pub fn new(album_artist: impl Into<String>, title: impl Into<String>) -> Self {
        let album_artist = album_artist.into();
        let title = title.into();
        let now = Utc::now();
        Self {
            id: album_id(&album_artist, &title),
            title,
            album_artist,
            uri: String::new(),
            first_track_uri: String::new(),
            track_count: 0,
            total_duration_secs: 0,
            source: SourceClass::Unknown,
            year: None,
            added_at: 0,
            last_played_at: None,
            artwork_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub album_count: u32,
    pub track_count: u32,
    pub artwork_id: Option<String>,
}

impl Artist {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: artist_id(&name),
            name,
            album_count: 0,
            track_count: 0,
            artwork_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub album_id: String,
    pub title: String,
    pub artist: String,
    pub uri: String,
    pub track_number: u32,
    pub disc_number: u32,
    pub duration_secs: f64,
    pub source: SourceClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtworkKind {
    Album,
    Artist,
}

impl ArtworkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::Artist => "artist",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "album" => Some(Self::Album),
            "artist" => Some(Self::Artist),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArtworkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored image, either cached on disk (`file_path`) or hotlinked
/// (`remote_url`). Exactly one of the two is expected to be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artwork {
    pub id: String,
    pub owner_id: String,
    pub kind: ArtworkKind,
    pub file_path: Option<String>,
    pub remote_url: Option<String>,
    pub source_provider: String,
    pub mime_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub byte_size: Option<i64>,
    pub content_hash: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Artwork {
    pub fn local(
        owner_id: impl Into<String>,
        kind: ArtworkKind,
        file_path: impl Into<String>,
        source_provider: impl Into<String>,
    ) -> Self {
        let owner_id = owner_id.into();
        Self {
            id: artwork_id(&owner_id, kind),
            owner_id,
            kind,
            file_path: Some(file_path.into()),
            remote_url: None,
            source_provider: source_provider.into(),
            mime_type: None,
            width: None,
            height: None,
            byte_size: None,
            content_hash: None,
            fetched_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn hotlinked(
        owner_id: impl Into<String>,
        kind: ArtworkKind,
        remote_url: impl Into<String>,
        source_provider: impl Into<String>,
    ) -> Self {
        let owner_id = owner_id.into();
        Self {
            id: artwork_id(&owner_id, kind),
            owner_id,
            kind,
            file_path: None,
            remote_url: Some(remote_url.into()),
            source_provider: source_provider.into(),
            mime_type: None,
            width: None,
            height: None,
            byte_size: None,
            content_hash: None,
            fetched_at: Utc::now(),
            expires_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioStation {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub icon: Option<String>,
    pub genre: Option<String>,
}

impl RadioStation {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        let name = name.into();
        let uri = uri.into();
        Self {
            id: station_id(&name, &uri),
            name,
            uri,
            icon: None,
            genre: None,
        }
    }
}

// ============================================================================
// Cache status
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub albums: u64,
    pub artists: u64,
    pub tracks: u64,
    pub stations: u64,
    pub artwork: u64,
    pub last_full_build: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub is_building: bool,
    pub build_progress: u8,
}

// ============================================================================
// Enrichment jobs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    AlbumArt,
    ArtistArt,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlbumArt => "album_art",
            Self::ArtistArt => "artist_art",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "album_art" => Some(Self::AlbumArt),
            "artist_art" => Some(Self::ArtistArt),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A durable artwork-fetch job. The id is `<owner_id>:<kind>`, so re-adding
/// a job for the same owner and kind replaces the earlier row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentJob {
    pub id: String,
    pub kind: JobKind,
    pub owner_id: String,
    /// Display name of the owner; artist jobs use it when the fallback chain
    /// searches by name instead of external id.
    pub owner_name: String,
    /// Resolved identifier-service id; may be empty for artist jobs.
    pub external_id: String,
    pub status: JobStatus,
    pub priority: i32,
    pub retry_count: u32,
    pub max_retries: u32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl EnrichmentJob {
    pub fn job_id(owner_id: &str, kind: JobKind) -> String {
        format!("{}:{}", owner_id, kind.as_str())
    }

    pub fn new(
        kind: JobKind,
        owner_id: impl Into<String>,
        owner_name: impl Into<String>,
        external_id: impl Into<String>,
    ) -> Self {
        let owner_id = owner_id.into();
        let now = Utc::now();
        Self {
            id: Self::job_id(&owner_id, kind),
            kind,
            owner_id,
            owner_name: owner_name.into(),
            external_id: external_id.into(),
            status: JobStatus::Pending,
            priority: 0,
            retry_count: 0,
            max_retries: 3,
            next_retry_at: Some(now),
            last_error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    pub pending: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
}

// ============================================================================
// Query parameters
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlbumScope {
    #[default]
    All,
    Nas,
    Local,
    Usb,
}

impl AlbumScope {
    pub fn parse(s: &str) -> Self {
        match s {
            "nas" => Self::Nas,
            "local" => Self::Local,
            "usb" => Self::Usb,
            _ => Self::All,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlbumSort {
    #[default]
    Alphabetical,
    ByArtist,
    RecentlyAdded,
    Year,
}

impl AlbumSort {
    pub fn parse(s: &str) -> Self {
        match s {
            "by_artist" | "artist" => Self::ByArtist,
            "recently_added" | "recent" => Self::RecentlyAdded,
            "year" => Self::Year,
            _ => Self::Alphabetical,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlbumFilter {
    pub scope: AlbumScope,
    /// Case-insensitive substring match on title or album artist.
    pub query: Option<String>,
    /// Exact album-artist match.
    pub artist: Option<String>,
}

pub const PAGE_LIMIT_DEFAULT: u32 = 50;
pub const PAGE_LIMIT_MAX: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    /// Normalizes out-of-range values: page floors at 1, limit is clamped to
    /// [1, 200] with 0 mapping to the default of 50.
    pub fn new(page: u32, limit: u32) -> Self {
        let limit = if limit == 0 {
            PAGE_LIMIT_DEFAULT
        } else {
            limit.min(PAGE_LIMIT_MAX)
        };
        Self {
            page: page.max(1),
            limit,
        }
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.limit
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            limit: PAGE_LIMIT_DEFAULT,
        }
    }
}
