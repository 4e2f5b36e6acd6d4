// SPDX-License-Identifier: GPL-3.0-or-later

/// Schema version 1. Executed on every open; all statements are idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS albums (
    id                  TEXT PRIMARY KEY,
    title               TEXT NOT NULL,
    album_artist        TEXT NOT NULL,
    uri                 TEXT NOT NULL,
    first_track_uri     TEXT NOT NULL DEFAULT '',
    track_count         INTEGER NOT NULL DEFAULT 0,
    total_duration_secs INTEGER NOT NULL DEFAULT 0,
    source              TEXT NOT NULL,
    year                INTEGER,
    added_at            INTEGER NOT NULL DEFAULT 0,
    last_played_at      INTEGER,
    artwork_id          TEXT NOT NULL DEFAULT '',
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_albums_album_artist ON albums (album_artist);
CREATE INDEX IF NOT EXISTS idx_albums_source ON albums (source);
CREATE INDEX IF NOT EXISTS idx_albums_year ON albums (year);
CREATE INDEX IF NOT EXISTS idx_albums_added_at ON albums (added_at DESC);
CREATE INDEX IF NOT EXISTS idx_albums_title_nocase ON albums (title COLLATE NOCASE);

CREATE TABLE IF NOT EXISTS artists (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    album_count INTEGER NOT NULL DEFAULT 0,
    track_count INTEGER NOT NULL DEFAULT 0,
    artwork_id  TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_artists_name_nocase ON artists (name COLLATE NOCASE);

CREATE TABLE IF NOT EXISTS tracks (
    id            TEXT PRIMARY KEY,
    album_id      TEXT NOT NULL,
    title         TEXT NOT NULL,
    artist        TEXT NOT NULL,
    uri           TEXT NOT NULL UNIQUE,
    track_number  INTEGER NOT NULL DEFAULT 0,
    disc_number   INTEGER NOT NULL DEFAULT 1,
    duration_secs REAL NOT NULL DEFAULT 0,
    source        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tracks_album_id ON tracks (album_id);
CREATE INDEX IF NOT EXISTS idx_tracks_artist_nocase ON tracks (artist COLLATE NOCASE);

CREATE TABLE IF NOT EXISTS artwork (
    id              TEXT PRIMARY KEY,
    owner_id        TEXT NOT NULL,
    kind            TEXT NOT NULL,
    file_path       TEXT,
    remote_url      TEXT,
    source_provider TEXT NOT NULL,
    mime_type       TEXT,
    width           INTEGER,
    height          INTEGER,
    byte_size       INTEGER,
    content_hash    TEXT,
    fetched_at      TEXT NOT NULL,
    expires_at      TEXT
);

CREATE INDEX IF NOT EXISTS idx_artwork_owner ON artwork (owner_id, kind);
CREATE INDEX IF NOT EXISTS idx_artwork_expires_at ON artwork (expires_at);

CREATE TABLE IF NOT EXISTS radio_stations (
    id    TEXT PRIMARY KEY,
    name  TEXT NOT NULL,
    uri   TEXT NOT NULL,
    icon  TEXT,
    genre TEXT
);

CREATE TABLE IF NOT EXISTS cache_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS enrichment_jobs (
    id            TEXT PRIMARY KEY,
    kind          TEXT NOT NULL,
    owner_id      TEXT NOT NULL,
    owner_name    TEXT NOT NULL DEFAULT '',
    external_id   TEXT NOT NULL DEFAULT '',
    status        TEXT NOT NULL,
    priority      INTEGER NOT NULL DEFAULT 0,
    retry_count   INTEGER NOT NULL DEFAULT 0,
    max_retries   INTEGER NOT NULL DEFAULT 3,
    next_retry_at TEXT,
    last_error    TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    completed_at  TEXT
);

CREATE INDEX IF NOT EXISTS idx_jobs_pending ON enrichment_jobs (status, next_retry_at);
"#;
