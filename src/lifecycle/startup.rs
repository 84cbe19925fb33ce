//! Startup orchestration.
//!
//! # Responsibilities
//! - Verify the storage dependency is reachable before accepting traffic
//!
//! # Design Decisions
//! - Fail fast: a dependency that never answers is fatal
//! - Probes back off linearly and share one overall deadline

use std::time::Duration;

use tokio::time::{self, Instant};

use super::LifecycleError;
use crate::config::StartupConfig;
use crate::resilience::linear_backoff;
use crate::storage::UserStore;

/// Probe `store` until it answers, giving up after `probe_attempts` failures
/// or when `overall_timeout_secs` elapses. Returns the attempt that succeeded.
pub async fn verify_dependency(
    store: &dyn UserStore,
    config: &StartupConfig,
) -> Result<u32, LifecycleError> {
    let deadline = Instant::now() + Duration::from_secs(config.overall_timeout_secs);
    let step = Duration::from_millis(config.backoff_step_ms);
    let mut last_error = String::from("no probe attempted");

    for attempt in 1..=config.probe_attempts {
        match time::timeout_at(deadline, store.ping()).await {
            Ok(Ok(())) => {
                tracing::info!(attempt, "Storage reachable");
                return Ok(attempt);
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    attempt,
                    max_attempts = config.probe_attempts,
                    error = %e,
                    "Storage probe failed"
                );
                last_error = e.to_string();
            }
            Err(_) => return Err(deadline_elapsed(attempt, &last_error)),
        }

        if attempt < config.probe_attempts
            && time::timeout_at(deadline, time::sleep(linear_backoff(attempt, step)))
                .await
                .is_err()
        {
            return Err(deadline_elapsed(attempt, &last_error));
        }
    }

    Err(LifecycleError::DependencyUnavailable {
        attempts: config.probe_attempts,
        reason: last_error,
    })
}

fn deadline_elapsed(attempts: u32, last_error: &str) -> LifecycleError {
    LifecycleError::DependencyUnavailable {
        attempts,
        reason: format!("startup deadline elapsed (last error: {last_error})"),
    }
}
