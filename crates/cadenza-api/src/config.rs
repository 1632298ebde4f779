//! Server configuration from the environment.
//!
//! Environment variables:
//!   DATABASE_URL        - PostgreSQL connection string (required)
//!   HOST                - bind address (default: "0.0.0.0")
//!   PORT                - bind port (default: 3000)
//!   ALLOWED_ORIGINS     - comma-separated CORS origins (default: "http://localhost:3000")
//!   DB_MAX_CONNECTIONS  - pool size override
//!   EVENT_BUS_CAPACITY  - broadcast buffer size (default: 256)
//!   LOG_FORMAT          - "json" or "text" (default: "text")
//!   LOG_FILE            - path to log file (optional, enables daily rotation)
//!   LOG_ANSI            - "true"/"false" override ANSI colors
//!
//! `RUST_LOG` is read directly by the tracing `EnvFilter`.

use std::str::FromStr;

use cadenza_core::{Error, Result};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000";
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub file: Option<String>,
    /// `None` means auto-detect on stdout and off for files.
    pub ansi: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub db_max_connections: Option<u32>,
    pub event_bus_capacity: usize,
    pub log: LogConfig,
}

impl ServerConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| Error::Config("DATABASE_URL must be set".to_string()))?;

        let allowed_origins = var("ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let event_bus_capacity = parse_var(&var, "EVENT_BUS_CAPACITY")?
            .unwrap_or(DEFAULT_EVENT_BUS_CAPACITY);
        if event_bus_capacity == 0 {
            return Err(Error::Config(
                "EVENT_BUS_CAPACITY must be greater than zero".to_string(),
            ));
        }

        let log = LogConfig {
            format: parse_var(&var, "LOG_FORMAT")?.unwrap_or_default(),
            file: var("LOG_FILE"),
            ansi: var("LOG_ANSI").map(|v| v == "true" || v == "1"),
        };

        Ok(Self {
            database_url,
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_var(&var, "PORT")?.unwrap_or(DEFAULT_PORT),
            allowed_origins,
            db_max_connections: parse_var(&var, "DB_MAX_CONNECTIONS")?,
            event_bus_capacity,
            log,
        })
    }

    /// `host:port`, ready for `SocketAddr` parsing.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("invalid {}={}: {}", key, raw, e)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/cadenza")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.allowed_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.db_max_connections, None);
        assert_eq!(config.event_bus_capacity, 256);
        assert_eq!(config.log, LogConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_database_url_required() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = config_from(&[("DATABASE_URL", "  ")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://db/cadenza"),
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("ALLOWED_ORIGINS", "https://a.example, ,https://b.example"),
            ("DB_MAX_CONNECTIONS", "20"),
            ("EVENT_BUS_CAPACITY", "1024"),
            ("LOG_FORMAT", "JSON"),
            ("LOG_FILE", "/var/log/cadenza/api.log"),
            ("LOG_ANSI", "false"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.db_max_connections, Some(20));
        assert_eq!(config.event_bus_capacity, 1024);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.file.as_deref(), Some("/var/log/cadenza/api.log"));
        assert_eq!(config.log.ansi, Some(false));
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for (key, value) in [
            ("PORT", "eighty"),
            ("DB_MAX_CONNECTIONS", "-1"),
            ("EVENT_BUS_CAPACITY", "0"),
            ("LOG_FORMAT", "xml"),
        ] {
            let err = config_from(&[("DATABASE_URL", "postgres://db/cadenza"), (key, value)])
                .unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{} should be rejected", key);
        }
    }
}
