//! Runtime configuration
//!
//! Built once at startup and handed to [`crate::PointsApi`]. Nothing below the
//! binary reads the environment.

use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::info;

pub const DB_ENV: &str = "ADULTPOINTS_DB";
pub const WRITE_RETRIES_ENV: &str = "ADULTPOINTS_WRITE_RETRIES";

const DEFAULT_WRITE_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite database file
    pub db_path: PathBuf,
    /// How many times a command re-applies itself after a version conflict
    pub max_write_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_write_retries: DEFAULT_WRITE_RETRIES,
        }
    }
}

impl Config {
    /// Read configuration from the environment, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            db_path: db_path_from(env::var(DB_ENV).ok()),
            max_write_retries: try_load(WRITE_RETRIES_ENV, DEFAULT_WRITE_RETRIES)?,
        })
    }

    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }

    pub fn with_max_write_retries(mut self, retries: u32) -> Self {
        self.max_write_retries = retries;
        self
    }
}

/// Default database path (~/.local/share/adultpoints/adultpoints.db)
pub fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("adultpoints").join("adultpoints.db")
}

/// An empty value counts as unset; SQLite would open a throwaway database.
fn db_path_from(value: Option<String>) -> PathBuf {
    match value {
        Some(v) if !v.trim().is_empty() => PathBuf::from(v),
        _ => {
            let path = default_db_path();
            info!("{DB_ENV} not set, using default: {}", path.display());
            path
        }
    }
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(value) => parse_value(key, &value),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn parse_value<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
