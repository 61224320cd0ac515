//! Runtime configuration.
//!
//! Values come from three layers, highest priority first: command-line or
//! environment overrides, an optional JSON config file, built-in defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::session::SessionConfig;

pub const DEFAULT_TREE_ENDPOINT: &str = "http://localhost:3000/api/dependency-tree";
pub const DEFAULT_VULNERABILITY_ENDPOINT: &str = "http://localhost:3000/api/check-vulnerabilities";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid URL for {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("timeout_secs must be greater than zero")]
    ZeroTimeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Endpoint answering `{ packages: [...] }` with `{ dependencyTrees: [...] }`.
    pub tree_endpoint: Url,
    /// Endpoint answering `{ packages: [...] }` with `{ vulnerabilities: [...] }`.
    pub vulnerability_endpoint: Url,
    /// Upper bound for every external call, in seconds.
    pub timeout_secs: u64,
}

/// One configuration layer, as read from a config file or collected from
/// the command line and environment. Unset fields fall through to the
/// layer below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub tree_endpoint: Option<String>,
    pub vulnerability_endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Fills every field left unset here from `lower`.
    fn over(self, lower: ConfigOverrides) -> ConfigOverrides {
        ConfigOverrides {
            tree_endpoint: self.tree_endpoint.or(lower.tree_endpoint),
            vulnerability_endpoint: self.vulnerability_endpoint.or(lower.vulnerability_endpoint),
            timeout_secs: self.timeout_secs.or(lower.timeout_secs),
        }
    }
}

impl Config {
    /// The built-in defaults, without any file or override.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::resolve(ConfigOverrides::default())
    }

    /// Parses a JSON config document; missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Self::resolve(serde_json::from_str(text)?)
    }

    /// Loads the file if one is given, then applies overrides on top.
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
            None => ConfigOverrides::default(),
        };
        Self::resolve(overrides.over(file))
    }

    fn resolve(layer: ConfigOverrides) -> Result<Self, ConfigError> {
        let tree_endpoint = layer.tree_endpoint.as_deref().unwrap_or(DEFAULT_TREE_ENDPOINT);
        let vulnerability_endpoint = layer
            .vulnerability_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_VULNERABILITY_ENDPOINT);
        let timeout_secs = layer.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(Self {
            tree_endpoint: parse_url("tree_endpoint", tree_endpoint)?,
            vulnerability_endpoint: parse_url("vulnerability_endpoint", vulnerability_endpoint)?,
            timeout_secs,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            timeout: self.timeout(),
        }
    }
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::defaults().unwrap();
        assert_eq!(config.tree_endpoint.as_str(), DEFAULT_TREE_ENDPOINT);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_json_partial() {
        let config = Config::from_json(r#"{"timeout_secs": 5}"#).unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(
            config.vulnerability_endpoint.as_str(),
            DEFAULT_VULNERABILITY_ENDPOINT
        );
    }

    #[test]
    fn test_from_json_rejects_bad_url() {
        let err = Config::from_json(r#"{"tree_endpoint": "not a url"}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidUrl {
                field: "tree_endpoint",
                ..
            }
        ));
    }

    #[test]
    fn test_from_json_rejects_wrong_type() {
        let err = Config::from_json(r#"{"timeout_secs": "soon"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let file: ConfigOverrides = serde_json::from_str(
            r#"{"timeout_secs": 5, "vulnerability_endpoint": "https://vulns.example.com/check"}"#,
        )
        .unwrap();
        let config = Config::resolve(
            ConfigOverrides {
                tree_endpoint: Some("https://deps.example.com/tree".to_string()),
                vulnerability_endpoint: None,
                timeout_secs: Some(9),
            }
            .over(file),
        )
        .unwrap();

        assert_eq!(config.tree_endpoint.host_str(), Some("deps.example.com"));
        assert_eq!(config.vulnerability_endpoint.host_str(), Some("vulns.example.com"));
        assert_eq!(config.session_config().timeout, Duration::from_secs(9));
    }

    #[test]
    fn test_override_invalid_url() {
        let err = Config::load(
            None,
            ConfigOverrides {
                vulnerability_endpoint: Some("::".to_string()),
                ..ConfigOverrides::default()
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidUrl {
                field: "vulnerability_endpoint",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(matches!(
            Config::from_json(r#"{"timeout_secs": 0}"#),
            Err(ConfigError::ZeroTimeout)
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/depscope.json")), ConfigOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
