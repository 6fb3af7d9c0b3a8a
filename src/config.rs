// TaskSync/backend-api/src/config.rs
use crate::db::PoolSettings;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set in environment variables or .env file")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub pool: PoolSettings,
    pub request_timeout: Duration,
    pub run_migrations: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`AppConfig::from_env`] but reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let frontend_url_prod = lookup("FRONTEND_URL_PROD")
            .unwrap_or_else(|| "http://localhost:8080".to_string());
        let frontend_url_dev =
            lookup("FRONTEND_URL_DEV").unwrap_or_else(|| "http://localhost:3000".to_string());

        let pool = PoolSettings {
            max_size: parse_or(&lookup, "DB_POOL_MAX_SIZE", 10)?,
            connect_attempts: parse_or(&lookup, "DB_CONNECT_ATTEMPTS", 5)?,
            connect_delay: Duration::from_millis(parse_or(&lookup, "DB_CONNECT_DELAY_MS", 2000)?),
        };

        Ok(AppConfig {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            allowed_origins: vec![frontend_url_prod, frontend_url_dev],
            pool,
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 5)?),
            run_migrations: parse_or(&lookup, "RUN_MIGRATIONS", true)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
