// SPDX-License-Identifier: GPL-3.0-or-later
use calliope_domain::{Page, RadioStation};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use crate::{CacheStore, Result};

const UPSERT_SQL: &str = r#"
INSERT INTO radio_stations (id, name, uri, icon, genre)
VALUES (?, ?, ?, ?, ?)
ON CONFLICT(id) DO UPDATE SET
    name = excluded.name,
    uri = excluded.uri,
    icon = excluded.icon,
    genre = excluded.genre
"#;

fn bind_station(
    station: &RadioStation,
) -> sqlx::query::Query<'_, Sqlite, sqlx::sqlite::SqliteArguments<'_>> {
    sqlx::query(UPSERT_SQL)
        .bind(&station.id)
        .bind(&station.name)
        .bind(&station.uri)
        .bind(&station.icon)
        .bind(&station.genre)
}

impl CacheStore {
    pub async fn upsert_station(&self, station: &RadioStation) -> Result<()> {
        bind_station(station).execute(self.pool()).await?;
        Ok(())
    }

    pub async fn upsert_station_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        station: &RadioStation,
    ) -> Result<()> {
        bind_station(station).execute(&mut **tx).await?;
        Ok(())
    }

    /// Page of stations matching a case-insensitive substring of name or
    /// genre, plus the unpaginated total.
    pub async fn query_stations(
        &self,
        query: Option<&str>,
        page: Page,
    ) -> Result<(Vec<RadioStation>, u64)> {
        let pattern = query
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")));

        let (count_sql, sql) = match &pattern {
            Some(_) => (
                "SELECT COUNT(*) AS n FROM radio_stations \
                 WHERE name LIKE ?1 ESCAPE '\\' OR genre LIKE ?1 ESCAPE '\\'",
                "SELECT * FROM radio_stations \
                 WHERE name LIKE ?1 ESCAPE '\\' OR genre LIKE ?1 ESCAPE '\\' \
                 ORDER BY name COLLATE NOCASE ASC LIMIT ?2 OFFSET ?3",
            ),
            None => (
                "SELECT COUNT(*) AS n FROM radio_stations",
                "SELECT * FROM radio_stations ORDER BY name COLLATE NOCASE ASC LIMIT ?1 OFFSET ?2",
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

        let mut stations = Vec::with_capacity(rows.len());
        for row in &rows {
            stations.push(row_to_station(row)?);
        }
        Ok((stations, total))
    }
}

pub(crate) fn row_to_station(row: &SqliteRow) -> Result<RadioStation> {
    Ok(RadioStation {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        uri: row.try_get("uri")?,
        icon: row.try_get("icon")?,
        genre: row.try_get("genre")?,
    })
}
