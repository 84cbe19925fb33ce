//! Configuration validation.
//!
//! Semantic checks only; serde handles syntax. All problems are collected
//! so an operator sees every mistake in one run.

use std::net::{IpAddr, SocketAddr};

use crate::config::schema::GatekeeperConfig;

/// Minimum signing secret length accepted in production.
pub const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// A single semantic problem with a configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &GatekeeperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.timeouts.health_probe_secs == 0 {
        errors.push(ValidationError::new("timeouts.health_probe_secs", "must be > 0"));
    }

    let rate_limit = &config.rate_limit;
    if rate_limit.requests_per_second == 0 {
        errors.push(ValidationError::new("rate_limit.requests_per_second", "must be > 0"));
    }
    if rate_limit.burst_size == 0 {
        errors.push(ValidationError::new("rate_limit.burst_size", "must be > 0"));
    }
    if rate_limit.cleanup_interval_secs == 0 {
        errors.push(ValidationError::new("rate_limit.cleanup_interval_secs", "must be > 0"));
    }
    for proxy in &rate_limit.trusted_proxies {
        if proxy.parse::<IpAddr>().is_err() {
            errors.push(ValidationError::new(
                "rate_limit.trusted_proxies",
                format!("'{}' is not an IP address", proxy),
            ));
        }
    }

    if config.auth.jwt_secret.is_empty() {
        errors.push(ValidationError::new("auth.jwt_secret", "is required"));
    } else if config.is_production() && config.auth.jwt_secret.len() < MIN_PRODUCTION_SECRET_LEN {
        errors.push(ValidationError::new(
            "auth.jwt_secret",
            format!("must be at least {} bytes in production", MIN_PRODUCTION_SECRET_LEN),
        ));
    }
    if config.auth.token_ttl_secs == 0 {
        errors.push(ValidationError::new("auth.token_ttl_secs", "must be > 0"));
    }
    let hash = &config.auth.password_hash;
    if hash.iterations == 0 || hash.parallelism == 0 || hash.memory_kib < 8 * hash.parallelism {
        errors.push(ValidationError::new(
            "auth.password_hash",
            "iterations and parallelism must be > 0 and memory_kib >= 8 * parallelism",
        ));
    }

    if config.startup.probe_attempts == 0 {
        errors.push(ValidationError::new("startup.probe_attempts", "must be > 0"));
    }
    if config.startup.overall_timeout_secs == 0 {
        errors.push(ValidationError::new("startup.overall_timeout_secs", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
