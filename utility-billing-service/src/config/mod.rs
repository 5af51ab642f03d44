//! Configuration module for utility-billing-service.

use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct BillingConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    /// `None` runs the service on the in-process store.
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl BillingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "utility-billing-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig::from_env()?,
        })
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Option<Self>, AppError> {
        let Some(url) = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        let max_connections = parse_var("DATABASE_MAX_CONNECTIONS", 10)?;
        let min_connections = parse_var("DATABASE_MIN_CONNECTIONS", 2)?;
        if min_connections > max_connections {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MIN_CONNECTIONS ({}) exceeds DATABASE_MAX_CONNECTIONS ({})",
                min_connections,
                max_connections
            )));
        }

        Ok(Some(Self {
            url,
            max_connections,
            min_connections,
        }))
    }
}

fn parse_var(name: &str, default: u32) -> Result<u32, AppError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!("{} must be a positive integer, got '{}'", name, raw))
        }),
        Err(_) => Ok(default),
    }
}
