use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Where the backend lives and how long a single call may take.
///
/// ```yaml
/// base_url: http://localhost:8000
/// request_timeout_ms: 10000
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    /// Transport-level timeout; `None` leaves calls unbounded.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            request_timeout_ms: None,
        }
    }
}

impl ClientConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let cfg: ClientConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// `GRID_API_URL` and `GRID_TIMEOUT_MS`, falling back to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Ok(url) = std::env::var("GRID_API_URL") {
            if !url.trim().is_empty() {
                cfg.base_url = url;
            }
        }
        if let Ok(ms) = std::env::var("GRID_TIMEOUT_MS") {
            let ms = ms.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                field: "GRID_TIMEOUT_MS",
                reason: e.to_string(),
            })?;
            cfg.request_timeout_ms = Some(ms);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid {
                field: "base_url",
                reason: "must not be empty".into(),
            });
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "base_url",
                reason: format!("expected an http(s) URL, got {url}"),
            });
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yaml() {
        let yaml = "base_url: http://grid.local:9000/\nrequest_timeout_ms: 2500\n";
        let cfg = ClientConfig::from_yaml(yaml).expect("config should parse");
        assert_eq!(cfg.base_url(), "http://grid.local:9000");
        assert_eq!(cfg.request_timeout_ms, Some(2500));
    }

    #[test]
    fn timeout_is_optional() {
        let cfg = ClientConfig::from_yaml("base_url: https://grid.example\n").unwrap();
        assert_eq!(cfg.request_timeout_ms, None);
    }

    #[test]
    fn rejects_bad_urls() {
        assert!(matches!(
            ClientConfig::from_yaml("base_url: ftp://nope\n"),
            Err(ConfigError::Invalid { field: "base_url", .. })
        ));
        assert!(matches!(
            ClientConfig::from_yaml("base_url: ''\n"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            ClientConfig::from_yaml("timeout: 3\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
