use std::env;
use std::str::FromStr;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "postgres" => Ok(StoreBackend::Postgres),
            other => Err(format!("unknown store backend {other}, expected memory/postgres")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {other}, expected compact/json")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_pool_size: usize,
    pub migrations_dir: String,
    pub store_timeout_ms: u64,
    pub event_buffer_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: parse_or_default("LOG_FORMAT", LogFormat::Compact)?,
            store_backend: parse_or_default("STORE_BACKEND", StoreBackend::Memory)?,
            database_url: env::var("DATABASE_URL").ok(),
            db_pool_size: parse_or_default("DB_POOL_SIZE", 16)?,
            migrations_dir: env::var("MIGRATIONS_DIR").unwrap_or_else(|_| "migrations".to_string()),
            store_timeout_ms: parse_or_default("STORE_TIMEOUT_MS", 5_000)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
        };

        if config.store_backend == StoreBackend::Postgres && config.database_url.is_none() {
            return Err(AppError::Internal(
                "DATABASE_URL is required when STORE_BACKEND=postgres".to_string(),
            ));
        }
        if config.event_buffer_size == 0 {
            return Err(AppError::Internal("EVENT_BUFFER_SIZE must be > 0".to_string()));
        }

        Ok(config)
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
