//! Per-identity rate limiting.
//!
//! A token bucket per client identity, created lazily on first sight. The
//! whole table sits behind one mutex, so every decision for an identity is
//! serialized with every other decision. Every `cleanup_interval` the table is
//! swapped for an empty one. That also resets buckets of clients that are
//! still active, so they get a fresh burst allowance each interval.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::time::{self, Instant};

use crate::config::RateLimitConfig;
use crate::http::request::RequestContext;
use crate::http::response::ApiError;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;

/// A single token bucket.
#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    fn refill(&mut self, capacity: f64, refill_rate: f64, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        if now > self.last_refill {
            self.last_refill = now;
        }
    }

    fn try_acquire(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn time_until_token(&self, refill_rate: f64) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / refill_rate)
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied { retry_after: Duration },
}

/// Token-bucket admission controller keyed by client identity.
pub struct AdmissionController {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    capacity: f64,
    refill_rate: f64,
    cleanup_interval: Duration,
}

impl AdmissionController {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_limits(
            f64::from(config.burst_size),
            f64::from(config.requests_per_second),
            config.cleanup_interval(),
        )
    }

    /// `capacity` tokens per bucket, refilled at `refill_rate` tokens per second.
    fn with_limits(capacity: f64, refill_rate: f64, cleanup_interval: Duration) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity,
            refill_rate,
            cleanup_interval,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TokenBucket>> {
        // A panic while holding the lock cannot leave a bucket outside
        // [0, capacity], so a poisoned table is still usable.
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Try to consume one token for `identity`.
    pub fn allow(&self, identity: &str) -> bool {
        matches!(self.check(identity), Admission::Allowed)
    }

    /// Time until `identity` would next be admitted. Zero for unknown identities.
    pub fn retry_after(&self, identity: &str) -> Duration {
        let now = Instant::now();
        let mut buckets = self.lock();
        match buckets.get_mut(identity) {
            Some(bucket) => {
                bucket.refill(self.capacity, self.refill_rate, now);
                bucket.time_until_token(self.refill_rate)
            }
            None => Duration::ZERO,
        }
    }

    /// Admit or deny `identity`, computing the retry delay under the same lock.
    pub fn check(&self, identity: &str) -> Admission {
        let now = Instant::now();
        let mut buckets = self.lock();
        let bucket = buckets
            .entry(identity.to_string())
            .or_insert_with(|| TokenBucket::new(self.capacity, now));

        bucket.refill(self.capacity, self.refill_rate, now);
        if bucket.try_acquire() {
            Admission::Allowed
        } else {
            Admission::Denied {
                retry_after: bucket.time_until_token(self.refill_rate),
            }
        }
    }

    /// Number of identities currently holding a bucket.
    pub fn tracked_identities(&self) -> usize {
        self.lock().len()
    }

    /// Replace the bucket table with an empty one, returning how many were dropped.
    pub fn evict_all(&self) -> usize {
        let dropped = std::mem::take(&mut *self.lock());
        dropped.len()
    }

    /// Periodic eviction loop. Runs until the shutdown signal fires.
    pub async fn run_eviction(self: Arc<Self>, mut shutdown: ShutdownSignal) {
        tracing::info!(
            interval_secs = self.cleanup_interval.as_secs(),
            "Rate bucket eviction starting"
        );

        let mut ticker = time::interval_at(
            Instant::now() + self.cleanup_interval,
            self.cleanup_interval,
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let dropped = self.evict_all();
                    metrics::record_tracked_identities(0);
                    tracing::debug!(dropped, "Rate bucket table reset");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate bucket eviction received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

/// Middleware enforcing the admission decision for the resolved client identity.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<AdmissionController>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let identity = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.client.clone())
        .unwrap_or_else(|| "unknown".to_string());

    match limiter.check(&identity) {
        Admission::Allowed => {
            metrics::record_tracked_identities(limiter.tracked_identities());
            next.run(request).await
        }
        Admission::Denied { retry_after } => {
            tracing::warn!(
                client = %identity,
                method = %request.method(),
                path = %request.uri().path(),
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
            metrics::record_rate_limited();
            ApiError::TooManyRequests { retry_after }.into_response()
        }
    }
}
