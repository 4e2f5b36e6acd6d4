// SPDX-License-Identifier: GPL-3.0-or-later
use calliope_domain::{Artwork, ArtworkKind};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use crate::{fmt_dt, opt_dt, CacheStore, Result, StoreError};

const UPSERT_SQL: &str = r#"
INSERT INTO artwork (
    id, owner_id, kind, file_path, remote_url, source_provider, mime_type,
    width, height, byte_size, content_hash, fetched_at, expires_at
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(id) DO UPDATE SET
    file_path = excluded.file_path,
    remote_url = excluded.remote_url,
    source_provider = excluded.source_provider,
    mime_type = excluded.mime_type,
    width = excluded.width,
    height = excluded.height,
    byte_size = excluded.byte_size,
    content_hash = excluded.content_hash,
    fetched_at = excluded.fetched_at,
    expires_at = excluded.expires_at
"#;

impl CacheStore {
    pub async fn upsert_artwork(&self, artwork: &Artwork) -> Result<()> {
        debug!(
            target: "store",
            artwork_id = %artwork.id,
            owner_id = %artwork.owner_id,
            provider = %artwork.source_provider,
            "upserting artwork"
        );
        sqlx::query(UPSERT_SQL)
            .bind(&artwork.id)
            .bind(&artwork.owner_id)
            .bind(artwork.kind.as_str())
            .bind(&artwork.file_path)
            .bind(&artwork.remote_url)
            .bind(&artwork.source_provider)
            .bind(&artwork.mime_type)
            .bind(artwork.width.map(|w| w as i64))
            .bind(artwork.height.map(|h| h as i64))
            .bind(artwork.byte_size)
            .bind(&artwork.content_hash)
            .bind(fmt_dt(artwork.fetched_at))
            .bind(artwork.expires_at.map(fmt_dt))
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn get_artwork(&self, id: &str) -> Result<Option<Artwork>> {
        let row = sqlx::query("SELECT * FROM artwork WHERE id = ? LIMIT 1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(|r| row_to_artwork(&r)).transpose()
    }

    pub async fn artwork_for_album(&self, album_id: &str) -> Result<Option<Artwork>> {
        let row = sqlx::query("SELECT * FROM artwork WHERE owner_id = ? AND kind = 'album' LIMIT 1")
            .bind(album_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(|r| row_to_artwork(&r)).transpose()
    }

    /// Artwork of any album credited to the given album artist. The artist
    /// fallback chain borrows one of these covers when no dedicated artist
    /// image can be found.
    pub async fn any_album_artwork_for_artist(&self, album_artist: &str) -> Result<Option<Artwork>> {
        let row = sqlx::query(
            "SELECT artwork.* FROM artwork \
             JOIN albums ON albums.id = artwork.owner_id \
             WHERE artwork.kind = 'album' AND albums.album_artist = ? \
             ORDER BY albums.added_at DESC LIMIT 1",
        )
        .bind(album_artist)
        .fetch_optional(self.pool())
        .await?;
        row.map(|r| row_to_artwork(&r)).transpose()
    }

    /// Store the artwork row and point the album at it.
    pub async fn link_album_artwork(&self, album_id: &str, artwork: &Artwork) -> Result<()> {
        self.upsert_artwork(artwork).await?;
        sqlx::query("UPDATE albums SET artwork_id = ?, updated_at = ? WHERE id = ?")
            .bind(&artwork.id)
            .bind(fmt_dt(chrono::Utc::now()))
            .bind(album_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Re-point rebuilt album and artist rows at artwork that survived the
    /// truncate. Runs as one statement per table at the end of a build.
    pub async fn relink_artwork(&self) -> Result<u64> {
        let albums = sqlx::query(
            "UPDATE albums SET artwork_id = \
                 (SELECT id FROM artwork WHERE owner_id = albums.id AND kind = 'album') \
             WHERE artwork_id = '' AND EXISTS \
                 (SELECT 1 FROM artwork WHERE owner_id = albums.id AND kind = 'album')",
        )
        .execute(self.pool())
        .await?
        .rows_affected();

        let artists = sqlx::query(
            "UPDATE artists SET artwork_id = \
                 (SELECT id FROM artwork WHERE owner_id = artists.id AND kind = 'artist') \
             WHERE artwork_id = '' AND EXISTS \
                 (SELECT 1 FROM artwork WHERE owner_id = artists.id AND kind = 'artist')",
        )
        .execute(self.pool())
        .await?
        .rows_affected();

        Ok(albums + artists)
    }

    /// Store the artwork row and point the artist at it.
    pub async fn link_artist_artwork(&self, artist_id: &str, artwork: &Artwork) -> Result<()> {
        self.upsert_artwork(artwork).await?;
        sqlx::query("UPDATE artists SET artwork_id = ? WHERE id = ?")
            .bind(&artwork.id)
            .bind(artist_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

pub(crate) fn row_to_artwork(row: &SqliteRow) -> Result<Artwork> {
    let kind_str: String = row.try_get("kind")?;
    let kind = ArtworkKind::parse(&kind_str)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown artwork kind: {}", kind_str)))?;

    Ok(Artwork {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        kind,
        file_path: row.try_get("file_path")?,
        remote_url: row.try_get("remote_url")?,
        source_provider: row.try_get("source_provider")?,
        mime_type: row.try_get("mime_type")?,
        width: row.try_get::<Option<i64>, _>("width")?.map(|w| w as u32),
        height: row.try_get::<Option<i64>, _>("height")?.map(|h| h as u32),
        byte_size: row.try_get("byte_size")?,
        content_hash: row.try_get("content_hash")?,
        fetched_at: crate::parse_dt(&row.try_get::<String, _>("fetched_at")?)?,
        expires_at: opt_dt(row.try_get("expires_at")?)?,
    })
}
