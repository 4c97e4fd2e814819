//! Runtime configuration read from the environment.
//!
//! A `.env` file in the working directory is loaded first when present.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | `sqlite://tasks.db?mode=rwc` |
//! | `DATABASE_MAX_CONNECTIONS` | `5` |
//! | `APP_HOST` | `0.0.0.0` |
//! | `APP_PORT` | `8080` |

use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub app_host: String,
    pub app_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://tasks.db?mode=rwc".to_string(),
            database_max_connections: 5,
            app_host: "0.0.0.0".to_string(),
            app_port: 8080,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source, falling back to
    /// [`AppConfig::default`] for anything unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            app_host: lookup("APP_HOST").unwrap_or(defaults.app_host),
            app_port: parse_or(&lookup, "APP_PORT", defaults.app_port)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app_host, self.app_port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|err: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: err.to_string(),
        }),
    }
}
