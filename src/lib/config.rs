use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://todos.db";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3002";
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must not be empty")]
    Empty { key: &'static str },
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    PartialTls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    Sqlite(String),
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub port: u16,
    pub cors_origin: HeaderValue,
    pub environment: Environment,
    pub tls: Option<TlsConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::Sqlite(DEFAULT_DATABASE_URL.to_string()),
            port: DEFAULT_PORT,
            cors_origin: HeaderValue::from_static(DEFAULT_CORS_ORIGIN),
            environment: Environment::Development,
            tls: None,
        }
    }
}

impl AppConfig {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unset keys fall back to
    /// defaults; set-but-invalid keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database = match lookup("DATABASE_URL") {
            None => defaults.database,
            Some(url) if url.trim().is_empty() => {
                return Err(ConfigError::Empty { key: "DATABASE_URL" });
            }
            Some(url) if url.trim().eq_ignore_ascii_case("memory") => DatabaseConfig::Memory,
            Some(url) if url.trim().starts_with("sqlite:") => {
                DatabaseConfig::Sqlite(url.trim().to_string())
            }
            Some(url) => {
                return Err(ConfigError::Invalid {
                    key: "DATABASE_URL",
                    value: url,
                    reason: "expected a sqlite: URL or \"memory\"".into(),
                });
            }
        };

        let port = parse_or(&lookup, "PORT", defaults.port)?;
        let environment = parse_or(&lookup, "APP_ENV", defaults.environment)?;

        let cors_origin = match lookup("CORS_ORIGIN") {
            None => defaults.cors_origin,
            Some(origin) => HeaderValue::from_str(origin.trim()).map_err(|e| {
                ConfigError::Invalid {
                    key: "CORS_ORIGIN",
                    value: origin.clone(),
                    reason: e.to_string(),
                }
            })?,
        };

        let tls = match (lookup("TLS_CERT_PATH"), lookup("TLS_KEY_PATH")) {
            (None, None) => None,
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: cert.into(),
                key_path: key.into(),
            }),
            _ => return Err(ConfigError::PartialTls),
        };

        Ok(Self {
            database,
            port,
            cors_origin,
            environment,
            tls,
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Err(ConfigError::Empty { key }),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
