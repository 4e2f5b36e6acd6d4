// SPDX-License-Identifier: GPL-3.0-or-later
use calliope_domain::{EnrichmentJob, JobKind, JobStats, JobStatus};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use crate::{fmt_dt, opt_dt, CacheStore, Result, StoreError};

impl CacheStore {
    /// Insert or replace a job. The id is `<owner>:<kind>`, so re-queueing
    /// the same owner resets the existing row.
    pub async fn add_job(&self, job: &EnrichmentJob) -> Result<()> {
        debug!(target: "store", job_id = %job.id, kind = %job.kind, "adding enrichment job");
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO enrichment_jobs (
                id, kind, owner_id, owner_name, external_id, status, priority,
                retry_count, max_retries, next_retry_at, last_error,
                created_at, updated_at, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(job.kind.as_str())
        .bind(&job.owner_id)
        .bind(&job.owner_name)
        .bind(&job.external_id)
        .bind(job.status.as_str())
        .bind(job.priority)
        .bind(job.retry_count as i64)
        .bind(job.max_retries as i64)
        .bind(job.next_retry_at.map(fmt_dt))
        .bind(&job.last_error)
        .bind(fmt_dt(job.created_at))
        .bind(fmt_dt(job.updated_at))
        .bind(job.completed_at.map(fmt_dt))
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn get_job(&self, id: &str) -> Result<EnrichmentJob> {
        let row = sqlx::query("SELECT * FROM enrichment_jobs WHERE id = ? LIMIT 1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        match row {
            Some(r) => row_to_job(&r),
            None => Err(StoreError::JobNotFound(id.to_string())),
        }
    }

    /// Pending jobs that are due, highest priority first, oldest first
    /// within a priority.
    pub async fn pending_jobs(&self, limit: u32) -> Result<Vec<EnrichmentJob>> {
        let now = fmt_dt(Utc::now());
        let rows = sqlx::query(
            "SELECT * FROM enrichment_jobs \
             WHERE status = 'pending' AND next_retry_at IS NOT NULL AND next_retry_at <= ? \
             ORDER BY priority DESC, created_at ASC LIMIT ?",
        )
        .bind(&now)
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;

        let mut jobs = Vec::with_capacity(rows.len());
        for row in &rows {
            jobs.push(row_to_job(row)?);
        }
        Ok(jobs)
    }

    pub async fn update_job(&self, job: &EnrichmentJob) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE enrichment_jobs SET
                owner_name = ?,
                external_id = ?,
                status = ?,
                priority = ?,
                retry_count = ?,
                next_retry_at = ?,
                last_error = ?,
                updated_at = ?,
                completed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&job.owner_name)
        .bind(&job.external_id)
        .bind(job.status.as_str())
        .bind(job.priority)
        .bind(job.retry_count as i64)
        .bind(job.next_retry_at.map(fmt_dt))
        .bind(&job.last_error)
        .bind(fmt_dt(Utc::now()))
        .bind(job.completed_at.map(fmt_dt))
        .bind(&job.id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::JobNotFound(job.id.clone()));
        }
        Ok(())
    }

    pub async fn delete_job(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM enrichment_jobs WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::JobNotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn job_stats(&self) -> Result<JobStats> {
        let rows =
            sqlx::query("SELECT status, COUNT(*) AS n FROM enrichment_jobs GROUP BY status")
                .fetch_all(self.pool())
                .await?;

        let mut stats = JobStats::default();
        for row in &rows {
            let status: String = row.try_get("status")?;
            let n = row.try_get::<i64, _>("n")? as u64;
            match JobStatus::parse(&status) {
                Some(JobStatus::Pending) => stats.pending = n,
                Some(JobStatus::Running) => stats.running = n,
                Some(JobStatus::Completed) => stats.completed = n,
                Some(JobStatus::Failed) => stats.failed = n,
                None => return Err(StoreError::Corrupt(format!("unknown job status: {}", status))),
            }
        }
        Ok(stats)
    }

    /// Reap completed jobs older than the retention window. Returns the
    /// number of rows removed.
    pub async fn cleanup_completed(&self, older_than: chrono::Duration) -> Result<u64> {
        let cutoff = fmt_dt(Utc::now() - older_than);
        let result = sqlx::query(
            "DELETE FROM enrichment_jobs \
             WHERE status = 'completed' AND completed_at IS NOT NULL AND completed_at < ?",
        )
        .bind(&cutoff)
        .execute(self.pool())
        .await?;
        let removed = result.rows_affected();
        if removed > 0 {
            debug!(target: "store", removed, "reaped completed jobs");
        }
        Ok(removed)
    }
}

fn row_to_job(row: &SqliteRow) -> Result<EnrichmentJob> {
    let kind_str: String = row.try_get("kind")?;
    let kind = JobKind::parse(&kind_str)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown job kind: {}", kind_str)))?;
    let status_str: String = row.try_get("status")?;
    let status = JobStatus::parse(&status_str)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown job status: {}", status_str)))?;

    Ok(EnrichmentJob {
        id: row.try_get("id")?,
        kind,
        owner_id: row.try_get("owner_id")?,
        owner_name: row.try_get("owner_name")?,
        external_id: row.try_get("external_id")?,
        status,
        priority: row.try_get("priority")?,
        retry_count: row.try_get::<i64, _>("retry_count")? as u32,
        max_retries: row.try_get::<i64, _>("max_retries")? as u32,
        next_retry_at: opt_dt(row.try_get("next_retry_at")?)?,
        last_error: row.try_get("last_error")?,
        created_at: crate::parse_dt(&row.try_get::<String, _>("created_at")?)?,
        updated_at: crate::parse_dt(&row.try_get::<String, _>("updated_at")?)?,
        completed_at: opt_dt(row.try_get("completed_at")?)?,
    })
}
