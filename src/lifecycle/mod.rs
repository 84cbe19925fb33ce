//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Probe storage → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain in-flight requests → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: an unreachable dependency at startup is fatal
//! - Shutdown has a grace period: forced close after the deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownOutcome, ShutdownSignal};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("dependency unavailable after {attempts} attempt(s): {reason}")]
    DependencyUnavailable { attempts: u32, reason: String },
    #[error("failed to initialize server: {0}")]
    Init(String),
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}
