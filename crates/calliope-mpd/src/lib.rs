// SPDX-License-Identifier: GPL-3.0-or-later

//! Thin adapter for the playback daemon's text protocol. One connection per
//! query; responses are `key: value` lines terminated by `OK`, errors by
//! `ACK`. The cache builder stays the sole translator to typed entities,
//! so everything returned here is string-map rows.

use anyhow::Result;
use calliope_library::provider::{keys, CatalogProvider, Row};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum MpdError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("daemon handshake failed: {0}")]
    Handshake(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("daemon rejected command: {0}")]
    Ack(String),

    #[error("daemon did not answer within {0:?}")]
    Timeout(Duration),
}

/// Client for the daemon's database and playlist queries.
#[derive(Debug, Clone)]
pub struct MpdClient {
    host: String,
    port: u16,
    timeout: Duration,
}

impl MpdClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one command over a fresh connection and collect the response
    /// pairs. Keys are lowercased; the daemon's tag casing varies.
    async fn command(&self, command: &str) -> Result<Vec<(String, String)>, MpdError> {
        tokio::time::timeout(self.timeout, self.command_inner(command))
            .await
            .map_err(|_| MpdError::Timeout(self.timeout))?
    }

    async fn command_inner(&self, command: &str) -> Result<Vec<(String, String)>, MpdError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        let mut reader = BufReader::new(stream);

        let mut banner = String::new();
        reader.read_line(&mut banner).await?;
        if !banner.starts_with("OK MPD") {
            return Err(MpdError::Handshake(banner.trim_end().to_string()));
        }

        trace!(target: "mpd", %command, "sending command");
        reader
            .get_mut()
            .write_all(format!("{}\n", command).as_bytes())
            .await?;

        let mut pairs = Vec::new();
        loop {
            let mut line = String::new();
            let read = reader.read_line(&mut line).await?;
            if read == 0 {
                return Err(MpdError::Protocol("connection closed mid-response".into()));
            }
            let line = line.trim_end();
            if line == "OK" {
                break;
            }
            if let Some(ack) = line.strip_prefix("ACK ") {
                return Err(MpdError::Ack(ack.to_string()));
            }
            match line.split_once(": ") {
                Some((key, value)) => pairs.push((key.to_lowercase(), value.to_string())),
                None => {
                    return Err(MpdError::Protocol(format!("malformed line: {:?}", line)));
                }
            }
        }

        debug!(target: "mpd", %command, pairs = pairs.len(), "command complete");
        Ok(pairs)
    }
}

#[async_trait::async_trait]
impl CatalogProvider for MpdClient {
    async fn album_details(&self, base_path: &str) -> Result<Vec<Row>> {
        let pairs = self
            .command(&format!("find base {}", quote_arg(base_path)))
            .await?;
        let songs = rows_by_delimiter(&pairs, keys::FILE);
        Ok(aggregate_albums(&songs))
    }

    async fn artist_album_counts(&self) -> Result<HashMap<String, u32>> {
        let pairs = self.command("list album group albumartist").await?;
        Ok(count_albums_per_artist(&pairs))
    }

    async fn album_tracks(&self, album: &str, album_artist: &str) -> Result<Vec<Row>> {
        let expression = format!(
            "((album == {}) AND (albumartist == {}))",
            quote_filter_value(album),
            quote_filter_value(album_artist)
        );
        let pairs = self
            .command(&format!("find {}", quote_arg(&expression)))
            .await?;
        Ok(rows_by_delimiter(&pairs, keys::FILE))
    }

    async fn playlists(&self) -> Result<Vec<String>> {
        let pairs = self.command("listplaylists").await?;
        Ok(pairs
            .into_iter()
            .filter(|(key, _)| key == "playlist")
            .map(|(_, name)| name)
            .collect())
    }

    async fn playlist_info(&self, name: &str) -> Result<Vec<Row>> {
        let pairs = self
            .command(&format!("listplaylistinfo {}", quote_arg(name)))
            .await?;
        Ok(rows_by_delimiter(&pairs, keys::FILE))
    }
}

/// Quote one protocol argument: double quotes, backslash-escaped.
fn quote_arg(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Quote a value inside a filter expression. The expression as a whole is
/// quoted again by [`quote_arg`], so inner values use single quotes.
fn quote_filter_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

/// Split a flat pair list into rows, starting a new row whenever the
/// delimiter key reappears. Pairs before the first delimiter are dropped.
fn rows_by_delimiter(pairs: &[(String, String)], delimiter: &str) -> Vec<Row> {
    let mut rows: Vec<Row> = Vec::new();
    for (key, value) in pairs {
        if key == delimiter {
            rows.push(Row::new());
        }
        if let Some(row) = rows.last_mut() {
            row.insert(key.clone(), value.clone());
        }
    }
    rows
}

/// Collapse song rows into one row per (album artist, album), computing the
/// aggregates the builder consumes.
fn aggregate_albums(songs: &[Row]) -> Vec<Row> {
    struct Aggregate {
        row: Row,
        track_count: u32,
        total_secs: f64,
    }

    let mut order: Vec<(String, String)> = Vec::new();
    let mut groups: HashMap<(String, String), Aggregate> = HashMap::new();

    for song in songs {
        let album = song.get(keys::ALBUM).cloned().unwrap_or_default();
        let artist = song
            .get(keys::ALBUM_ARTIST)
            .or_else(|| song.get(keys::ARTIST))
            .cloned()
            .unwrap_or_default();
        let group_key = (artist.clone(), album.clone());

        let aggregate = groups.entry(group_key.clone()).or_insert_with(|| {
            order.push(group_key);
            let mut row = Row::new();
            row.insert(keys::ALBUM.into(), album);
            row.insert(keys::ALBUM_ARTIST.into(), artist);
            if let Some(file) = song.get(keys::FILE) {
                row.insert(keys::FIRST_TRACK.into(), file.clone());
            }
            if let Some(date) = song.get("date") {
                row.insert(keys::YEAR.into(), date.clone());
            }
            Aggregate {
                row,
                track_count: 0,
                total_secs: 0.0,
            }
        });

        aggregate.track_count += 1;
        aggregate.total_secs += song
            .get(keys::DURATION)
            .and_then(|d| d.parse::<f64>().ok())
            .or_else(|| song.get(keys::TIME).and_then(|t| t.parse::<f64>().ok()))
            .unwrap_or(0.0);
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .map(|aggregate| {
            let mut row = aggregate.row;
            row.insert(keys::TRACK_COUNT.into(), aggregate.track_count.to_string());
            row.insert(
                keys::TOTAL_TIME.into(),
                (aggregate.total_secs.round() as u64).to_string(),
            );
            row
        })
        .collect()
}

/// Walk a `list album group albumartist` response: each `albumartist` line
/// opens a group, each following `album` line counts toward it.
fn count_albums_per_artist(pairs: &[(String, String)]) -> HashMap<String, u32> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    let mut current: Option<String> = None;
    for (key, value) in pairs {
        match key.as_str() {
            "albumartist" => {
                counts.entry(value.clone()).or_insert(0);
                current = Some(value.clone());
            }
            "album" => {
                if let Some(artist) = &current {
                    if !value.is_empty() {
                        *counts.entry(artist.clone()).or_insert(0) += 1;
                    }
                }
            }
            _ => {}
        }
    }
    counts
}
