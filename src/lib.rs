//! Gatekeeper: an authentication and admission-control service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::request (trace ID, client identity)
//!                          │
//!                          ▼
//!                     security (headers, rate limit, bearer token)
//!                          │
//!                          ▼
//!                     http::handlers ──▶ auth (password, token, service)
//!                                              │
//!                                              ▼
//!                                         storage (UserStore)
//!
//!     Cross-cutting: config, observability, resilience, lifecycle
//! ```

// Core subsystems
pub mod auth;
pub mod config;
pub mod http;
pub mod storage;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::schema::GatekeeperConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
