use dotenvy::dotenv;
use std::env;
use thiserror::Error;

use crate::storage::MAX_DOCUMENT_BYTES;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATABASE_URL: &str = "file://./data/investment_files";
/// Just under the per-record document limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 15 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("PORT must be a number, got {0:?}")]
    InvalidPort(String),
    #[error("MAX_UPLOAD_BYTES must be a number between 1 and {max}, got {value:?}")]
    InvalidUploadLimit { value: String, max: usize },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(limit) if limit > 0 && limit <= MAX_DOCUMENT_BYTES => limit,
                _ => {
                    return Err(ConfigError::InvalidUploadLimit {
                        value: raw,
                        max: MAX_DOCUMENT_BYTES,
                    });
                }
            },
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            max_upload_bytes,
        })
    }

    /// Listen address as a `(host, port)` pair; hostnames and bare IPv6
    /// literals are resolved by the listener.
    pub fn bind_addr(&self) -> (&str, u16) {
        (&self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn falls_back_to_local_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.max_upload_bytes, 15 * 1024 * 1024);
        assert_eq!(config.bind_addr(), ("0.0.0.0", 3000));
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("DATABASE_URL", "memory://"),
            ("MAX_UPLOAD_BYTES", "1024"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr(), ("127.0.0.1", 8080));
        assert_eq!(config.database_url, "memory://");
        assert_eq!(config.max_upload_bytes, 1024);
    }

    #[test]
    fn rejects_non_numeric_port() {
        let err = config_from(&[("PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(p) if p == "http"));
    }

    #[test]
    fn rejects_upload_limit_above_record_limit() {
        let too_big = (MAX_DOCUMENT_BYTES + 1).to_string();
        let err = config_from(&[("MAX_UPLOAD_BYTES", &too_big)]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUploadLimit { .. }));

        let err = config_from(&[("MAX_UPLOAD_BYTES", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUploadLimit { .. }));
    }

    #[test]
    fn keeps_bare_ipv6_host() {
        let config = config_from(&[("HOST", "::"), ("PORT", "3000")]).unwrap();
        assert_eq!(config.bind_addr(), ("::", 3000));
    }

    #[tokio::test]
    async fn hostname_bind_addr_resolves() {
        let config = config_from(&[("HOST", "localhost"), ("PORT", "0")]).unwrap();

        let listener = tokio::net::TcpListener::bind(config.bind_addr()).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }
}
