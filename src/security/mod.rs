//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (resolve client identity, add security response headers)
//!     → rate_limit.rs (per-identity token bucket)
//!     → access_control.rs (bearer token, protected routes only)
//!     → Pass to handlers
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input: proxy headers only from trusted peers

pub mod access_control;
pub mod headers;
pub mod rate_limit;

pub use access_control::access_control_middleware;
pub use headers::{ClientIdentityResolver, SecurityHeadersLayer};
pub use rate_limit::{rate_limit_middleware, Admission, AdmissionController};
