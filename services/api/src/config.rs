//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use campus_portal_core::admin::AdminIdentity;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub storage_root: PathBuf,
    pub public_base_url: String,
    pub cors_origin: String,
    pub openai_api_key: Option<String>,
    pub analysis_model: String,
    pub session_ttl_days: i64,
    pub admin: Option<AdminIdentity>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_vars(&std::env::vars().collect())
    }

    /// Builds the configuration from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| vars.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        // --- Server and Database Settings ---
        let bind_address_str = or_default("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url =
            get("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = or_default("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Storage and HTTP Settings ---
        let storage_root = PathBuf::from(or_default("STORAGE_ROOT", "./storage"));
        let public_base_url = or_default("PUBLIC_BASE_URL", "http://localhost:3000");
        let cors_origin = or_default("CORS_ORIGIN", "http://localhost:3000");

        let session_ttl_str = or_default("SESSION_TTL_DAYS", "30");
        let session_ttl_days = session_ttl_str
            .parse::<i64>()
            .ok()
            .filter(|days| *days > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "SESSION_TTL_DAYS".to_string(),
                    format!("'{}' is not a positive number of days", session_ttl_str),
                )
            })?;

        // --- Analysis Model ---
        let openai_api_key = get("OPENAI_API_KEY");
        let analysis_model = or_default("ANALYSIS_MODEL", "gpt-4o-mini");

        // --- Admin Bootstrap (all or nothing) ---
        let admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminIdentity {
                email,
                password,
                full_name: or_default("ADMIN_NAME", "Administrator"),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingVar("ADMIN_PASSWORD".to_string())),
            (None, Some(_)) => return Err(ConfigError::MissingVar("ADMIN_EMAIL".to_string())),
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            storage_root,
            public_base_url,
            cors_origin,
            openai_api_key,
            analysis_model,
            session_ttl_days,
            admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_vars(&vars(&[("DATABASE_URL", "postgres://localhost/portal")])).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.analysis_model, "gpt-4o-mini");
        assert_eq!(config.session_ttl_days, 30);
        assert!(config.admin.is_none());
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(
            Config::from_vars(&vars(&[])),
            Err(ConfigError::MissingVar(name)) if name == "DATABASE_URL"
        ));
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = Config::from_vars(&vars(&[
            ("DATABASE_URL", "postgres://localhost/portal"),
            ("BIND_ADDRESS", "not-an-address"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(name, _) if name == "BIND_ADDRESS"));

        let err = Config::from_vars(&vars(&[
            ("DATABASE_URL", "postgres://localhost/portal"),
            ("SESSION_TTL_DAYS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(name, _) if name == "SESSION_TTL_DAYS"));
    }

    #[test]
    fn admin_identity_needs_both_email_and_password() {
        let config = Config::from_vars(&vars(&[
            ("DATABASE_URL", "postgres://localhost/portal"),
            ("ADMIN_EMAIL", "admin@campus.example"),
            ("ADMIN_PASSWORD", "s3cret-pass"),
        ]))
        .unwrap();
        let admin = config.admin.unwrap();
        assert_eq!(admin.full_name, "Administrator");

        let err = Config::from_vars(&vars(&[
            ("DATABASE_URL", "postgres://localhost/portal"),
            ("ADMIN_EMAIL", "admin@campus.example"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(name) if name == "ADMIN_PASSWORD"));
    }
}
