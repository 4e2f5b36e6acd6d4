// SPDX-License-Identifier: GPL-3.0-or-later
use calliope_domain::{Album, AlbumFilter, AlbumScope, AlbumSort, Page, SourceClass};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use tracing::debug;

use crate::{fmt_dt, opt_str, parse_dt, CacheStore, Result};

// Prior non-empty first_track_uri / artwork_id / added_at survive an upsert;
// everything else is overlaid by the incoming row. created_at is written once.
const UPSERT_SQL: &str = r#"
INSERT INTO albums (
    id, title, album_artist, uri, first_track_uri, track_count,
    total_duration_secs, source, year, added_at, last_played_at,
    artwork_id, created_at, updated_at
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(id) DO UPDATE SET
    title = excluded.title,
    album_artist = excluded.album_artist,
    uri = excluded.uri,
    first_track_uri = CASE WHEN albums.first_track_uri != ''
        THEN albums.first_track_uri ELSE excluded.first_track_uri END,
    track_count = excluded.track_count,
    total_duration_secs = excluded.total_duration_secs,
    source = excluded.source,
    year = excluded.year,
    added_at = CASE WHEN albums.added_at != 0
        THEN albums.added_at ELSE excluded.added_at END,
    last_played_at = COALESCE(excluded.last_played_at, albums.last_played_at),
    artwork_id = CASE WHEN albums.artwork_id != ''
        THEN albums.artwork_id ELSE excluded.artwork_id END,
    updated_at = excluded.updated_at
"#;

fn bind_album(album: &Album) -> sqlx::query::Query<'_, Sqlite, sqlx::sqlite::SqliteArguments<'_>> {
    sqlx::query(UPSERT_SQL)
        .bind(&album.id)
        .bind(&album.title)
        .bind(&album.album_artist)
        .bind(&album.uri)
        .bind(&album.first_track_uri)
        .bind(album.track_count as i64)
        .bind(album.total_duration_secs as i64)
        .bind(album.source.as_str())
        .bind(album.year)
        .bind(album.added_at)
        .bind(album.last_played_at)
        .bind(album.artwork_id.as_deref().unwrap_or(""))
        .bind(fmt_dt(album.created_at))
        .bind(fmt_dt(album.updated_at))
}

impl CacheStore {
    pub async fn upsert_album(&self, album: &Album) -> Result<()> {
        debug!(target: "store", album_id = %album.id, title = %album.title, "upserting album");
        bind_album(album).execute(self.pool()).await?;
        Ok(())
    }

    pub async fn upsert_album_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        album: &Album,
    ) -> Result<()> {
        bind_album(album).execute(&mut **tx).await?;
        Ok(())
    }

    pub async fn get_album(&self, id: &str) -> Result<Option<Album>> {
        let row = sqlx::query("SELECT * FROM albums WHERE id = ? LIMIT 1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(|r| row_to_album(&r)).transpose()
    }

    /// Run the catalog album query: filter, sort, page slice, and the
    /// unpaginated total of matching rows.
    pub async fn query_albums(
        &self,
        filter: &AlbumFilter,
        sort: AlbumSort,
        page: Page,
    ) -> Result<(Vec<Album>, u64)> {
        let (where_clause, binds) = build_filter(filter);

        let count_sql = format!("SELECT COUNT(*) AS n FROM albums{}", where_clause);
        let mut count_query = sqlx::query(&count_sql);
        for bind in &binds {
            count_query = count_query.bind(bind);
        }
        let total = count_query.fetch_one(self.pool()).await?.get::<i64, _>("n") as u64;

        let sql = format!(
            "SELECT * FROM albums{} ORDER BY {} LIMIT ? OFFSET ?",
            where_clause,
            order_clause(sort)
        );
        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }
        query = query.bind(page.limit as i64).bind(page.offset() as i64);

        let rows = query.fetch_all(self.pool()).await?;
        debug!(
            target: "store",
            returned = rows.len(),
            total,
            page = page.page,
            "album query"
        );

        let mut albums = Vec::with_capacity(rows.len());
        for row in &rows {
            albums.push(row_to_album(row)?);
        }
        Ok((albums, total))
    }

    /// All albums without linked artwork; the enrichment coordinator seeds
    /// its job queue from this.
    pub async fn albums_missing_artwork(&self) -> Result<Vec<Album>> {
        let rows = sqlx::query("SELECT * FROM albums WHERE artwork_id = '' ORDER BY added_at DESC")
            .fetch_all(self.pool())
            .await?;
        let mut albums = Vec::with_capacity(rows.len());
        for row in &rows {
            albums.push(row_to_album(row)?);
        }
        Ok(albums)
    }
}

fn build_filter(filter: &AlbumFilter) -> (String, Vec<String>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut binds: Vec<String> = Vec::new();

    match filter.scope {
        AlbumScope::All => {}
        AlbumScope::Nas => {
            conditions.push("source = 'nas'".to_string());
        }
        AlbumScope::Local => {
            conditions.push("source IN ('local', 'usb')".to_string());
        }
        AlbumScope::Usb => {
            conditions.push("source = 'usb'".to_string());
        }
    }

    if let Some(query) = filter.query.as_deref().filter(|q| !q.is_empty()) {
        conditions.push(
            "(title LIKE ? ESCAPE '\\' OR album_artist LIKE ? ESCAPE '\\')".to_string(),
        );
        let pattern = format!("%{}%", escape_like(query));
        binds.push(pattern.clone());
        binds.push(pattern);
    }

    if let Some(artist) = filter.artist.as_deref().filter(|a| !a.is_empty()) {
        conditions.push("album_artist = ?".to_string());
        binds.push(artist.to_string());
    }

    if conditions.is_empty() {
        (String::new(), binds)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), binds)
    }
}

fn order_clause(sort: AlbumSort) -> &'static str {
    match sort {
        AlbumSort::Alphabetical => "title COLLATE NOCASE ASC, album_artist COLLATE NOCASE ASC, id ASC",
        AlbumSort::ByArtist => "album_artist COLLATE NOCASE ASC, title COLLATE NOCASE ASC, id ASC",
        // added_at of 0 (never reported) sorts after every real timestamp
        AlbumSort::RecentlyAdded => "added_at DESC, title COLLATE NOCASE ASC, id ASC",
        // NULL years sort last under DESC in SQLite
        AlbumSort::Year => "year DESC, title COLLATE NOCASE ASC, id ASC",
    }
}

/// LIKE patterns treat % and _ as wildcards; user input must match literally.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

pub(crate) fn row_to_album(row: &SqliteRow) -> Result<Album> {
    Ok(Album {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        album_artist: row.try_get("album_artist")?,
        uri: row.try_get("uri")?,
        first_track_uri: row.try_get("first_track_uri")?,
        track_count: row.try_get::<i64, _>("track_count")? as u32,
        total_duration_secs: row.try_get::<i64, _>("total_duration_secs")? as u32,
        source: SourceClass::parse(&row.try_get::<String, _>("source")?),
        year: row.try_get("year")?,
        added_at: row.try_get("added_at")?,
        last_played_at: row.try_get("last_played_at")?,
        artwork_id: opt_str(row.try_get("artwork_id")?),
        created_at: parse_dt(&row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_dt(&row.try_get::<String, _>("updated_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50% off_deal"), "50\\% off\\_deal");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_build_filter_combines_conditions() {
        let filter = AlbumFilter {
            scope: AlbumScope::Local,
            query: Some("ok".to_string()),
            artist: Some("Radiohead".to_string()),
        };
        let (clause, binds) = build_filter(&filter);
        assert!(clause.contains("source IN ('local', 'usb')"));
        assert!(clause.contains("title LIKE ?"));
        assert!(clause.contains("album_artist = ?"));
        assert_eq!(binds, vec!["%ok%", "%ok%", "Radiohead"]);
    }

    #[test]
    fn test_build_filter_empty() {
        let (clause, binds) = build_filter(&AlbumFilter::default());
        assert!(clause.is_empty());
        assert!(binds.is_empty());
    }
}
