//! Shutdown coordination.

use std::time::Duration;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::LifecycleError;

/// Coordinator for graceful shutdown.
///
/// The trigger latches: a task that subscribes after `trigger` still sees it.
/// Clones share the same state.
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half handed to long-running tasks.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown has been triggered, including before this call.
    pub async fn recv(&mut self) {
        // A dropped coordinator also means shutdown.
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}

/// How the server finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every in-flight request completed within the grace period.
    Drained,
    /// The grace period elapsed and remaining connections were dropped.
    ForcedClose,
}

/// Wait up to `grace` for a server task that has stopped accepting to finish.
pub async fn drain(
    mut server: JoinHandle<std::io::Result<()>>,
    grace: Duration,
) -> Result<ShutdownOutcome, LifecycleError> {
    match tokio::time::timeout(grace, &mut server).await {
        Ok(Ok(result)) => {
            result?;
            Ok(ShutdownOutcome::Drained)
        }
        Ok(Err(e)) => Err(LifecycleError::Serve(std::io::Error::other(e))),
        Err(_) => {
            tracing::error!(
                grace_secs = grace.as_secs(),
                "In-flight requests did not finish within grace period, forcing close"
            );
            server.abort();
            Ok(ShutdownOutcome::ForcedClose)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_channel() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.clone().subscribe();
        assert_eq!(shutdown.receiver_count(), 1);
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("subscriber should observe the trigger");
    }

    #[tokio::test]
    async fn test_trigger_before_subscribe_is_seen() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();

        let mut late = shutdown.subscribe();
        tokio::time::timeout(Duration::from_secs(1), late.recv())
            .await
            .expect("latched trigger should resolve immediately");
    }

    #[tokio::test]
    async fn test_dropped_coordinator_releases_waiters() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        drop(shutdown);
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("waiter should be released");
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_completes() {
        let server = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        });
        let outcome = drain(server, Duration::from_secs(5)).await.unwrap();
        assert_eq!(outcome, ShutdownOutcome::Drained);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_forced_after_grace() {
        let server = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });
        let start = tokio::time::Instant::now();
        let outcome = drain(server, Duration::from_secs(5)).await.unwrap();
        assert_eq!(outcome, ShutdownOutcome::ForcedClose);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_drain_propagates_server_error() {
        let server = tokio::spawn(async { Err(std::io::Error::other("boom")) });
        let err = drain(server, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Serve(_)));
    }
}
