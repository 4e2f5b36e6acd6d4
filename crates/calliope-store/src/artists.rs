// SPDX-License-Identifier: GPL-3.0-or-later
use calliope_domain::{Artist, Page};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use tracing::debug;

use crate::{opt_str, CacheStore, Result};

const UPSERT_SQL: &str = r#"
INSERT INTO artists (id, name, album_count, track_count, artwork_id)
VALUES (?, ?, ?, ?, ?)
ON CONFLICT(id) DO UPDATE SET
    name = excluded.name,
    album_count = excluded.album_count,
    track_count = excluded.track_count,
    artwork_id = CASE WHEN artists.artwork_id != ''
        THEN artists.artwork_id ELSE excluded.artwork_id END
"#;

fn bind_artist(artist: &Artist) -> sqlx::query::Query<'_, Sqlite, sqlx::sqlite::SqliteArguments<'_>> {
    sqlx::query(UPSERT_SQL)
        .bind(&artist.id)
        .bind(&artist.name)
        .bind(artist.album_count as i64)
        .bind(artist.track_count as i64)
        .bind(artist.artwork_id.as_deref().unwrap_or(""))
}

impl CacheStore {
    pub async fn upsert_artist(&self, artist: &Artist) -> Result<()> {
        debug!(target: "store", artist_id = %artist.id, name = %artist.name, "upserting artist");
        bind_artist(artist).execute(self.pool()).await?;
        Ok(())
    }

    pub async fn upsert_artist_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        artist: &Artist,
    ) -> Result<()> {
        bind_artist(artist).execute(&mut **tx).await?;
        Ok(())
    }

    pub async fn get_artist(&self, id: &str) -> Result<Option<Artist>> {
        let row = sqlx::query("SELECT * FROM artists WHERE id = ? LIMIT 1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(|r| row_to_artist(&r)).transpose()
    }

    pub async fn get_artist_by_name(&self, name: &str) -> Result<Option<Artist>> {
        let row = sqlx::query("SELECT * FROM artists WHERE name = ? LIMIT 1")
            .bind(name)
            .fetch_optional(self.pool())
            .await?;
        row.map(|r| row_to_artist(&r)).transpose()
    }

    /// Name-ordered page of artists, optionally narrowed by a
    /// case-insensitive name-prefix query, plus the unpaginated total.
    pub async fn query_artists(
        &self,
        query: Option<&str>,
        page: Page,
    ) -> Result<(Vec<Artist>, u64)> {
        let pattern = query
            .filter(|q| !q.is_empty())
            .map(|q| format!("{}%", q.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")));

        let (count_sql, sql) = match &pattern {
            Some(_) => (
                "SELECT COUNT(*) AS n FROM artists WHERE name LIKE ? ESCAPE '\\'",
                "SELECT * FROM artists WHERE name LIKE ? ESCAPE '\\' \
                 ORDER BY name COLLATE NOCASE ASC LIMIT ? OFFSET ?",
            ),
            None => (
                "SELECT COUNT(*) AS n FROM artists",
                "SELECT * FROM artists ORDER BY name COLLATE NOCASE ASC LIMIT ? OFFSET ?",
            ),
        };

        let mut count_query = sqlx::query(count_sql);
        if let Some(p) = &pattern {
            count_query = count_query.bind(p);
        }
        let total = count_query.fetch_one(self.pool()).await?.get::<i64, _>("n") as u64;

        let mut rows_query = sqlx::query(sql);
        if let Some(p) = &pattern {
            rows_query = rows_query.bind(p);
        }
        let rows = rows_query
            .bind(page.limit as i64)
            .bind(page.offset() as i64)
            .fetch_all(self.pool())
            .await?;

        let mut artists = Vec::with_capacity(rows.len());
        for row in &rows {
            artists.push(row_to_artist(row)?);
        }
        Ok((artists, total))
    }

    /// Artists without any linked image, for enrichment seeding.
    pub async fn artists_missing_artwork(&self) -> Result<Vec<Artist>> {
        let rows =
            sqlx::query("SELECT * FROM artists WHERE artwork_id = '' ORDER BY name COLLATE NOCASE")
                .fetch_all(self.pool())
                .await?;
        let mut artists = Vec::with_capacity(rows.len());
        for row in &rows {
            artists.push(row_to_artist(row)?);
        }
        Ok(artists)
    }
}

pub(crate) fn row_to_artist(row: &SqliteRow) -> Result<Artist> {
    Ok(Artist {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        album_count: row.try_get::<i64, _>("album_count")? as u32,
        track_count: row.try_get::<i64, _>("track_count")? as u32,
        artwork_id: opt_str(row.try_get("artwork_id")?),
    })
}
