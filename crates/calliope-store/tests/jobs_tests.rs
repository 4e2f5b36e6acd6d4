use calliope_domain::{EnrichmentJob, JobKind, JobStatus};
use calliope_store::{CacheStore, StoreError};
use chrono::{Duration, Utc};
use tempfile::TempDir;

async fn open_store() -> (CacheStore, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let store = CacheStore::open(dir.path()).await.expect("open store");
    (store, dir)
}

#[tokio::test]
async fn test_add_job_replaces_existing_id() {
    let (store, _dir) = open_store().await;

    let mut job = EnrichmentJob::new(JobKind::AlbumArt, "owner-1", "", "mbid-a");
    store.add_job(&job).await.expect("add");

    job.external_id = "mbid-b".to_string();
    job.retry_count = 2;
    store.add_job(&job).await.expect("re-add");

    let stats = store.job_stats().await.expect("stats");
    assert_eq!(stats.pending, 1, "same id replaces the row");

    let fetched = store.get_job("owner-1:album_art").await.expect("get");
    assert_eq!(fetched.external_id, "mbid-b");
    assert_eq!(fetched.retry_count, 2);
}

#[tokio::test]
async fn test_pending_jobs_ordering_and_due_filter() {
    let (store, _dir) = open_store().await;
    let now = Utc::now();

    let mut low = EnrichmentJob::new(JobKind::AlbumArt, "low", "", "x");
    low.priority = 0;
    low.created_at = now - Duration::minutes(10);

    let mut high = EnrichmentJob::new(JobKind::AlbumArt, "high", "", "y");
    high.priority = 5;
    high.created_at = now - Duration::minutes(5);

    let mut older = EnrichmentJob::new(JobKind::ArtistArt, "older", "Artist", "");
    older.priority = 5;
    older.created_at = now - Duration::minutes(20);

    let mut future = EnrichmentJob::new(JobKind::AlbumArt, "future", "", "z");
    future.next_retry_at = Some(now + Duration::hours(1));

    let mut unscheduled = EnrichmentJob::new(JobKind::AlbumArt, "unscheduled", "", "w");
    unscheduled.next_retry_at = None;

    for job in [&low, &high, &older, &future, &unscheduled] {
        store.add_job(job).await.expect("add");
    }

    let pending = store.pending_jobs(10).await.expect("pending");
    let ids: Vec<&str> = pending.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["older:artist_art", "high:album_art", "low:album_art"],
        "priority desc, then created asc; future and unscheduled excluded"
    );

    let limited = store.pending_jobs(1).await.expect("pending");
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, "older:artist_art");
}

#[tokio::test]
async fn test_update_job_transitions() {
    let (store, _dir) = open_store().await;

    let mut job = EnrichmentJob::new(JobKind::AlbumArt, "owner", "", "mbid");
    store.add_job(&job).await.expect("add");

    job.status = JobStatus::Running;
    store.update_job(&job).await.expect("to running");

    job.status = JobStatus::Completed;
    job.completed_at = Some(Utc::now());
    store.update_job(&job).await.expect("to completed");

    let fetched = store.get_job(&job.id).await.expect("get");
    assert_eq!(fetched.status, JobStatus::Completed);
    assert!(fetched.completed_at.is_some());

    let pending = store.pending_jobs(10).await.expect("pending");
    assert!(pending.is_empty(), "completed jobs never reappear as pending");
}

#[tokio::test]
async fn test_get_and_update_missing_job() {
    let (store, _dir) = open_store().await;

    let missing = store.get_job("nope:album_art").await;
    assert!(matches!(missing, Err(StoreError::JobNotFound(_))));

    let ghost = EnrichmentJob::new(JobKind::AlbumArt, "ghost", "", "");
    let result = store.update_job(&ghost).await;
    assert!(matches!(result, Err(StoreError::JobNotFound(_))));

    let result = store.delete_job("ghost:album_art").await;
    assert!(matches!(result, Err(StoreError::JobNotFound(_))));
}

#[tokio::test]
async fn test_delete_job() {
    let (store, _dir) = open_store().await;
    let job = EnrichmentJob::new(JobKind::ArtistArt, "owner", "Artist", "");
    store.add_job(&job).await.expect("add");
    store.delete_job(&job.id).await.expect("delete");
    assert!(matches!(
        store.get_job(&job.id).await,
        Err(StoreError::JobNotFound(_))
    ));
}

#[tokio::test]
async fn test_job_stats_counts_per_status() {
    let (store, _dir) = open_store().await;

    let pending = EnrichmentJob::new(JobKind::AlbumArt, "p", "", "");
    let mut failed = EnrichmentJob::new(JobKind::AlbumArt, "f", "", "");
    failed.status = JobStatus::Failed;
    let mut done = EnrichmentJob::new(JobKind::ArtistArt, "c", "A", "");
    done.status = JobStatus::Completed;
    done.completed_at = Some(Utc::now());

    for job in [&pending, &failed, &done] {
        store.add_job(job).await.expect("add");
    }

    let stats = store.job_stats().await.expect("stats");
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.running, 0);
}

#[tokio::test]
async fn test_cleanup_completed_respects_retention() {
    let (store, _dir) = open_store().await;

    let mut stale = EnrichmentJob::new(JobKind::AlbumArt, "stale", "", "");
    stale.status = JobStatus::Completed;
    stale.completed_at = Some(Utc::now() - Duration::days(10));

    let mut fresh = EnrichmentJob::new(JobKind::AlbumArt, "fresh", "", "");
    fresh.status = JobStatus::Completed;
    fresh.completed_at = Some(Utc::now() - Duration::hours(1));

    let pending = EnrichmentJob::new(JobKind::AlbumArt, "pending", "", "");

    for job in [&stale, &fresh, &pending] {
        store.add_job(job).await.expect("add");
    }

    let removed = store.cleanup_completed(Duration::days(7)).await.expect("cleanup");
    assert_eq!(removed, 1);

    let stats = store.job_stats().await.expect("stats");
    assert_eq!(stats.completed, 1, "fresh completed job kept");
    assert_eq!(stats.pending, 1, "pending jobs untouched");
}
