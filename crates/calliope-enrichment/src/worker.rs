// SPDX-License-Identifier: GPL-3.0-or-later

use calliope_artwork::ProviderError;
use calliope_domain::{Artwork, ArtworkKind, EnrichmentJob, JobKind, JobStatus};
use calliope_store::CacheStore;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::providers::{AlbumArtSource, ArtistImageSearch, ArtistImageSource};
use crate::saver::ArtworkSaver;

/// Completed jobs older than this are reaped.
const JOB_RETENTION_DAYS: i64 = 7;
const CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Seconds between drain passes; the first pass runs immediately.
    pub tick_interval: Duration,
    /// Jobs taken per pass, processed strictly sequentially.
    pub batch_size: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            batch_size: 10,
        }
    }
}

/// How a single attempt ended; drives the per-job state machine.
enum AttemptError {
    /// Terminal; the job fails without touching retry_count.
    Permanent(String),
    /// Worth retrying with backoff.
    Transient(String),
    /// Caller shutdown; the job reverts untouched.
    Cancelled,
}

/// Background worker that drains pending enrichment jobs, honoring the
/// providers' rate limits by processing one job at a time.
pub struct EnrichmentWorker {
    store: CacheStore,
    saver: Arc<ArtworkSaver>,
    album_art: Arc<dyn AlbumArtSource>,
    artist_images: Option<Arc<dyn ArtistImageSource>>,
    artist_search: Option<Arc<dyn ArtistImageSearch>>,
    config: WorkerConfig,
}

impl EnrichmentWorker {
    pub fn new(
        store: CacheStore,
        saver: Arc<ArtworkSaver>,
        album_art: Arc<dyn AlbumArtSource>,
        artist_images: Option<Arc<dyn ArtistImageSource>>,
        artist_search: Option<Arc<dyn ArtistImageSearch>>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            saver,
            album_art,
            artist_images,
            artist_search,
            config,
        }
    }

    /// Spawn the drain loop. The first tick fires immediately; the loop
    /// exits when the token is cancelled.
    pub fn run(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                target: "worker",
                interval_secs = self.config.tick_interval.as_secs(),
                batch_size = self.config.batch_size,
                "enrichment worker started"
            );

            let mut ticker = interval(self.config.tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_cleanup = Instant::now();

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!(target: "worker", "enrichment worker stopping");
                        return;
                    }
                    _ = ticker.tick() => {}
                }

                if let Err(err) = self.tick(&cancel).await {
                    error!(target: "worker", error = %err, "drain pass failed");
                }

                if last_cleanup.elapsed() >= CLEANUP_INTERVAL {
                    last_cleanup = Instant::now();
                    match self
                        .store
                        .cleanup_completed(ChronoDuration::days(JOB_RETENTION_DAYS))
                        .await
                    {
                        Ok(removed) if removed > 0 => {
                            info!(target: "worker", removed, "completed jobs reaped");
                        }
                        Ok(_) => {}
                        Err(err) => warn!(target: "worker", error = %err, "job cleanup failed"),
                    }
                }
            }
        })
    }

    /// One drain pass: fetch due jobs and process them in order. Returns
    /// the number of jobs attempted.
    pub async fn tick(&self, cancel: &CancellationToken) -> anyhow::Result<usize> {
        let jobs = self.store.pending_jobs(self.config.batch_size).await?;
        if jobs.is_empty() {
            return Ok(0);
        }
        debug!(target: "worker", batch = jobs.len(), "processing job batch");

        let mut attempted = 0usize;
        for job in jobs {
            if cancel.is_cancelled() {
                debug!(target: "worker", "cancelled mid-batch; remaining jobs untouched");
                break;
            }
            self.process_job(job, cancel).await;
            attempted += 1;
        }
        Ok(attempted)
    }

    async fn process_job(&self, mut job: EnrichmentJob, cancel: &CancellationToken) {
        debug!(
            target: "worker",
            job_id = %job.id,
            kind = %job.kind,
            retry_count = job.retry_count,
            "job attempt starting"
        );

        job.status = JobStatus::Running;
        if let Err(err) = self.store.update_job(&job).await {
            error!(target: "worker", job_id = %job.id, error = %err, "failed to mark job running");
            return;
        }

        let outcome = match job.kind {
            JobKind::AlbumArt => self.handle_album_job(&job, cancel).await,
            JobKind::ArtistArt => self.handle_artist_job(&job, cancel).await,
        };

        match outcome {
            Ok(source) => {
                job.status = JobStatus::Completed;
                job.completed_at = Some(Utc::now());
                job.next_retry_at = None;
                job.last_error = None;
                info!(
                    target: "worker",
                    job_id = %job.id,
                    owner_id = %job.owner_id,
                    source,
                    "job completed"
                );
            }
            Err(AttemptError::Cancelled) => {
                // Put the job back untouched so the next run retries it.
                job.status = JobStatus::Pending;
                if let Err(err) = self.store.update_job(&job).await {
                    error!(target: "worker", job_id = %job.id, error = %err, "failed to requeue job");
                }
                return;
            }
            Err(AttemptError::Permanent(message)) => {
                job.status = JobStatus::Failed;
                job.last_error = Some(message.clone());
                warn!(
                    target: "worker",
                    job_id = %job.id,
                    owner_id = %job.owner_id,
                    external_id = %job.external_id,
                    message,
                    "job failed permanently"
                );
            }
            Err(AttemptError::Transient(message)) => {
                job.retry_count += 1;
                job.last_error = Some(message.clone());
                if job.retry_count >= job.max_retries {
                    job.status = JobStatus::Failed;
                    warn!(
                        target: "worker",
                        job_id = %job.id,
                        retry_count = job.retry_count,
                        message,
                        "job failed after exhausting retries"
                    );
                } else {
                    let delay = backoff(job.retry_count);
                    job.status = JobStatus::Pending;
                    job.next_retry_at = Some(Utc::now() + delay);
                    warn!(
                        target: "worker",
                        job_id = %job.id,
                        retry_count = job.retry_count,
                        delay_secs = delay.num_seconds(),
                        message,
                        "job rescheduled"
                    );
                }
            }
        }

        if let Err(err) = self.store.update_job(&job).await {
            error!(target: "worker", job_id = %job.id, error = %err, "failed to persist job outcome");
        }
    }

    async fn handle_album_job(
        &self,
        job: &EnrichmentJob,
        cancel: &CancellationToken,
    ) -> Result<&'static str, AttemptError> {
        if job.external_id.is_empty() {
            return Err(AttemptError::Permanent("album job has no external id".into()));
        }

        let image = self
            .album_art
            .fetch_album_art(&job.external_id, cancel)
            .await
            .map_err(classify_provider_error)?;

        self.saver
            .save_album_art(&job.owner_id, &image, "coverart")
            .await
            // A full disk or a locked store clears up; try again later.
            .map_err(|err| AttemptError::Transient(format!("saving album art: {:#}", err)))?;
        Ok("coverart")
    }

    /// Artist fallback cascade, stopping at the first success:
    /// preferred provider (local bytes) → name search (hotlinked URL) →
    /// any owned album's artwork. All three missing means not found.
    async fn handle_artist_job(
        &self,
        job: &EnrichmentJob,
        cancel: &CancellationToken,
    ) -> Result<&'static str, AttemptError> {
        if let Some(provider) = self.artist_images.as_ref() {
            if !job.external_id.is_empty() {
                match provider.fetch_artist_image(&job.external_id, cancel).await {
                    Ok(image) => {
                        self.saver
                            .save_artist_art(&job.owner_id, &image, "fanarttv")
                            .await
                            .map_err(|err| {
                                AttemptError::Transient(format!("saving artist art: {:#}", err))
                            })?;
                        return Ok("fanarttv");
                    }
                    Err(ProviderError::Cancelled) => return Err(AttemptError::Cancelled),
                    Err(error) => {
                        debug!(
                            target: "worker",
                            job_id = %job.id,
                            %error,
                            "preferred artist provider missed; trying name search"
                        );
                    }
                }
            }
        }

        if let Some(search) = self.artist_search.as_ref() {
            if !job.owner_name.is_empty() {
                match search.search_artist_image(&job.owner_name, cancel).await {
                    Ok(url) => {
                        let artwork = Artwork::hotlinked(
                            &job.owner_id,
                            ArtworkKind::Artist,
                            url,
                            calliope_artwork::deezer::DEEZER_SOURCE,
                        );
                        self.store
                            .link_artist_artwork(&job.owner_id, &artwork)
                            .await
                            .map_err(|err| {
                                AttemptError::Transient(format!("linking artist art: {}", err))
                            })?;
                        return Ok(calliope_artwork::deezer::DEEZER_SOURCE);
                    }
                    Err(ProviderError::Cancelled) => return Err(AttemptError::Cancelled),
                    Err(error) => {
                        debug!(
                            target: "worker",
                            job_id = %job.id,
                            %error,
                            "name search missed; borrowing album artwork"
                        );
                    }
                }
            }
        }

        match self.store.any_album_artwork_for_artist(&job.owner_name).await {
            Ok(Some(album_art)) => {
                let artwork = match (&album_art.remote_url, &album_art.file_path) {
                    (Some(url), _) => {
                        Artwork::hotlinked(&job.owner_id, ArtworkKind::Artist, url, "album_art")
                    }
                    (None, Some(path)) => {
                        Artwork::local(&job.owner_id, ArtworkKind::Artist, path, "album_art")
                    }
                    (None, None) => {
                        return Err(AttemptError::Permanent("artwork not found".into()));
                    }
                };
                self.store
                    .link_artist_artwork(&job.owner_id, &artwork)
                    .await
                    .map_err(|err| {
                        AttemptError::Transient(format!("linking borrowed art: {}", err))
                    })?;
                Ok("album_art")
            }
            Ok(None) => Err(AttemptError::Permanent("artwork not found".into())),
            Err(err) => Err(AttemptError::Transient(format!(
                "album artwork lookup: {}",
                err
            ))),
        }
    }
}

fn classify_provider_error(error: ProviderError) -> AttemptError {
    match error {
        ProviderError::NotFound => AttemptError::Permanent("artwork not found".into()),
        ProviderError::Cancelled => AttemptError::Cancelled,
        error if error.is_transient() => AttemptError::Transient(error.to_string()),
        error => AttemptError::Permanent(error.to_string()),
    }
}

/// `min(1 minute * 2^retry_count, 24 hours)`: 2, 4, 8, 16, 32 minutes and
/// onward until the cap.
fn backoff(retry_count: u32) -> ChronoDuration {
    let cap = ChronoDuration::hours(24);
    // 2^11 minutes already exceeds the cap; clamping keeps the shift sane.
    let exponent = retry_count.min(11);
    let delay = ChronoDuration::minutes(1) * 2i32.pow(exponent);
    if delay > cap {
        cap
    } else {
        delay
    }
}
