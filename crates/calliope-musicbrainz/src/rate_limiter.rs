// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Returned when a rate-limiter wait is interrupted by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitCancelled;

impl std::fmt::Display for WaitCancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("rate-limiter wait cancelled")
    }
}

impl std::error::Error for WaitCancelled {}

/// Interval rate limiter shared by the upstream metadata clients.
///
/// Enforces a minimum delay between successful acquisitions on one client;
/// the identifier service allows 1 request per second for non-commercial
/// use, and the artwork providers have limits of their own.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    min_interval: Duration,
    last_request: Arc<tokio::sync::Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Create a rate limiter with the given minimum interval between
    /// requests.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            min_interval,
            last_request: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    /// Create a rate limiter from a requests-per-second budget.
    pub fn per_second(rps: f64) -> Self {
        let interval = if rps > 0.0 {
            Duration::from_secs_f64(1.0 / rps)
        } else {
            Duration::from_secs(1)
        };
        Self::new(interval)
    }

    /// Wait until a request may be made, or until the token is cancelled.
    /// Waiters queue on an internal semaphore, so concurrent callers are
    /// released one interval apart.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<(), WaitCancelled> {
        if cancel.is_cancelled() {
            return Err(WaitCancelled);
        }

        let _permit = tokio::select! {
            permit = self.semaphore.acquire() => {
                permit.map_err(|_| WaitCancelled)?
            }
            _ = cancel.cancelled() => return Err(WaitCancelled),
        };

        let mut last = self.last_request.lock().await;

        if let Some(last_instant) = *last {
            let elapsed = last_instant.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::trace!(target: "musicbrainz", "rate limiting: waiting {:?}", wait_time);
                tokio::select! {
                    _ = sleep(wait_time) => {}
                    _ = cancel.cancelled() => return Err(WaitCancelled),
                }
            }
        }

        *last = Some(Instant::now());
        Ok(())
    }
}
