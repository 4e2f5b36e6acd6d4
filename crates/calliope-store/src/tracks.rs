// SPDX-License-Identifier: GPL-3.0-or-later
use calliope_domain::{SourceClass, Track};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use tracing::debug;

use crate::{CacheStore, Result};

// The track id is derived from the uri, so the uri is the conflict target;
// a re-scanned file folds into its existing row.
const UPSERT_SQL: &str = r#"
INSERT INTO tracks (
    id, album_id, title, artist, uri, track_number, disc_number,
    duration_secs, source
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(uri) DO UPDATE SET
    album_id = excluded.album_id,
    title = excluded.title,
    artist = excluded.artist,
    track_number = excluded.track_number,
    disc_number = excluded.disc_number,
    duration_secs = excluded.duration_secs,
    source = excluded.source
"#;

fn bind_track(track: &Track) -> sqlx::query::Query<'_, Sqlite, sqlx::sqlite::SqliteArguments<'_>> {
    sqlx::query(UPSERT_SQL)
        .bind(&track.id)
        .bind(&track.album_id)
        .bind(&track.title)
        .bind(&track.artist)
        .bind(&track.uri)
        .bind(track.track_number as i64)
        .bind(track.disc_number as i64)
        .bind(track.duration_secs)
        .bind(track.source.as_str())
}

impl CacheStore {
    pub async fn upsert_track(&self, track: &Track) -> Result<()> {
        debug!(target: "store", track_id = %track.id, uri = %track.uri, "upserting track");
        bind_track(track).execute(self.pool()).await?;
        Ok(())
    }

    pub async fn upsert_track_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        track: &Track,
    ) -> Result<()> {
        bind_track(track).execute(&mut **tx).await?;
        Ok(())
    }

    /// All tracks of an album in playing order.
    pub async fn tracks_for_album(&self, album_id: &str) -> Result<Vec<Track>> {
        let rows = sqlx::query(
            "SELECT * FROM tracks WHERE album_id = ? ORDER BY disc_number ASC, track_number ASC",
        )
        .bind(album_id)
        .fetch_all(self.pool())
        .await?;

        let mut tracks = Vec::with_capacity(rows.len());
        for row in &rows {
            tracks.push(row_to_track(row)?);
        }
        Ok(tracks)
    }
}

pub(crate) fn row_to_track(row: &SqliteRow) -> Result<Track> {
    Ok(Track {
        id: row.try_get("id")?,
        album_id: row.try_get("album_id")?,
        title: row.try_get("title")?,
        artist: row.try_get("artist")?,
        uri: row.try_get("uri")?,
        track_number: row.try_get::<i64, _>("track_number")? as u32,
        disc_number: row.try_get::<i64, _>("disc_number")? as u32,
        duration_secs: row.try_get("duration_secs")?,
        source: SourceClass::parse(&row.try_get::<String, _>("source")?),
    })
}
