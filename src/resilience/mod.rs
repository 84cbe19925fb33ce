//! Resilience subsystem.
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Startup dependency probes retry with a linear backoff inside an
//!   overall deadline

pub mod backoff;

pub use backoff::linear_backoff;
