//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! POST /auth/register, /auth/login:
//!     → service.rs (lookup / create via storage)
//!     → password.rs (Argon2id hash or verify)
//!     → token.rs (issue signed identity token)
//!
//! Protected request:
//!     → security::access_control (extract bearer token)
//!     → token.rs (validate, yield subject)
//! ```

pub mod password;
pub mod service;
pub mod token;

pub use password::{CredentialCodec, PasswordError};
pub use service::{AuthError, AuthResponse, AuthService};
pub use token::{TokenError, TokenIssuer};
