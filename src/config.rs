//! Runtime configuration read from the environment (and `.env` via dotenvy).

use crate::error::ConfigError;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/school";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:2019";

/// Which storage backend the server wires into the services.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Limits applied to `page`/`size` query parameters.
#[derive(Clone, Copy, Debug)]
pub struct PagingConfig {
    pub default_size: u64,
    pub max_size: u64,
}

impl Default for PagingConfig {
    fn default() -> Self {
        PagingConfig {
            default_size: 3,
            max_size: 1000,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub backend: StoreBackend,
    pub bind_addr: String,
    pub max_connections: u32,
    pub paging: PagingConfig,
    pub max_body_bytes: usize,
    pub seed_demo_data: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            backend: StoreBackend::Postgres,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_connections: 5,
            paging: PagingConfig::default(),
            max_body_bytes: 1024 * 1024,
            seed_demo_data: false,
        }
    }
}

impl AppConfig {
    /// Build from process environment. Unset keys fall back to defaults; malformed values fail.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map instead of touching the environment).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let paging = PagingConfig {
            default_size: parse_or(&lookup, "DEFAULT_PAGE_SIZE", defaults.paging.default_size)?,
            max_size: parse_or(&lookup, "MAX_PAGE_SIZE", defaults.paging.max_size)?,
        };
        if paging.default_size == 0 || paging.default_size > paging.max_size {
            return Err(ConfigError::InvalidValue {
                key: "DEFAULT_PAGE_SIZE",
                value: paging.default_size.to_string(),
            });
        }
        let backend = match lookup("STORE_BACKEND") {
            Some(v) => v.parse()?,
            None => defaults.backend,
        };
        Ok(AppConfig {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            backend,
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            paging,
            max_body_bytes: parse_or(&lookup, "MAX_BODY_BYTES", defaults.max_body_bytes)?,
            seed_demo_data: parse_or(&lookup, "SEED_DEMO_DATA", defaults.seed_demo_data)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}
