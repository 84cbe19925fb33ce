//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (trace ID, client identity, request log)
//!     → security (headers, admission, access control)
//!     → handlers.rs (register, login, me, health)
//!     → response.rs (JSON errors)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestContext, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer};
