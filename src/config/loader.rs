//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::GatekeeperConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid override {name}: {message}")]
    Override { name: &'static str, message: String },
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply process environment
/// overrides, then validate.
pub fn load(path: Option<&Path>) -> Result<GatekeeperConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => GatekeeperConfig::default(),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn parse_file(path: &Path) -> Result<GatekeeperConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply `GATEKEEPER_*` overrides. `lookup` abstracts the environment so the
/// mapping can be exercised without touching process state.
pub fn apply_env_overrides<F>(config: &mut GatekeeperConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(env) = get("GATEKEEPER_ENV") {
        config.environment = env.parse().map_err(|message| ConfigError::Override {
            name: "GATEKEEPER_ENV",
            message,
        })?;
    }
    if let Some(bind) = get("GATEKEEPER_BIND_ADDRESS") {
        config.listener.bind_address = bind;
    }
    if let Some(secret) = get("GATEKEEPER_JWT_SECRET") {
        config.auth.jwt_secret = secret;
    }
    if let Some(level) = get("GATEKEEPER_LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(rps) = get("GATEKEEPER_RATE_LIMIT_RPS") {
        config.rate_limit.requests_per_second = parse_number("GATEKEEPER_RATE_LIMIT_RPS", &rps)?;
    }
    if let Some(burst) = get("GATEKEEPER_RATE_LIMIT_BURST") {
        config.rate_limit.burst_size = parse_number("GATEKEEPER_RATE_LIMIT_BURST", &burst)?;
    }
    Ok(())
}

fn parse_number(name: &'static str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|e: std::num::ParseIntError| ConfigError::Override {
        name,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Environment;
    use std::collections::HashMap;

    #[test]
    fn test_parse_partial_toml_uses_defaults() {
        let config: GatekeeperConfig = toml::from_str(
            r#"
            environment = "production"

            [rate_limit]
            requests_per_second = 5
            trusted_proxies = ["10.0.0.1"]

            [auth]
            jwt_secret = "s"
            "#,
        )
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.rate_limit.requests_per_second, 5);
        assert_eq!(config.rate_limit.burst_size, 20);
        assert_eq!(config.rate_limit.cleanup_interval_secs, 300);
        assert_eq!(config.auth.token_ttl_secs, 86_400);
        assert_eq!(config.shutdown.grace_period_secs, 30);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GATEKEEPER_ENV", "prod"),
            ("GATEKEEPER_JWT_SECRET", "from-env"),
            ("GATEKEEPER_RATE_LIMIT_RPS", "42"),
            ("GATEKEEPER_LOG_LEVEL", ""),
        ]
        .into_iter()
        .collect();

        let mut config = GatekeeperConfig::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert!(config.is_production());
        assert_eq!(config.auth.jwt_secret, "from-env");
        assert_eq!(config.rate_limit.requests_per_second, 42);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_bad_numeric_override() {
        let mut config = GatekeeperConfig::default();
        let err = apply_env_overrides(&mut config, |k| {
            (k == "GATEKEEPER_RATE_LIMIT_BURST").then(|| "lots".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Override { name: "GATEKEEPER_RATE_LIMIT_BURST", .. }));
    }
}
