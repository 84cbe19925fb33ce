//! Linear backoff.

use std::time::Duration;

/// Delay before retrying after failed attempt number `attempt` (1-based):
/// `attempt * step`. Attempt 0 gets no delay.
pub fn linear_backoff(attempt: u32, step: Duration) -> Duration {
    step.saturating_mul(attempt)
}
