use std::path::Path;
use thiserror::Error;
use url::Url;

use super::types::{ClientConfigFile, EndpointConfig};
use crate::infrastructure::{EndpointError, parse_endpoint, resolve_endpoint};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),
    #[error("Endpoint needs either a url or a page_origin")]
    MissingEndpoint,
    #[error("No topics configured")]
    NoTopics,
    #[error("Invalid setting {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Load client configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClientConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: ClientConfigFile = serde_json::from_str(&content)?;
    Ok(config)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<ClientConfigFile, ConfigError> {
    let config: ClientConfigFile = serde_json::from_str(json)?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<ClientConfigFile, ConfigError> {
    let default_config = include_str!("client_config.json");
    load_config_from_str(default_config)
}

impl EndpointConfig {
    /// Resolve to a `ws://` or `wss://` URL
    pub fn resolve(&self) -> Result<Url, ConfigError> {
        match (&self.url, &self.page_origin) {
            (Some(url), _) => Ok(parse_endpoint(url)?),
            (None, Some(origin)) => Ok(resolve_endpoint(origin, &self.path)?),
            (None, None) => Err(ConfigError::MissingEndpoint),
        }
    }
}

impl ClientConfigFile {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint.resolve()?;
        if self.topics.is_empty() {
            return Err(ConfigError::NoTopics);
        }
        if self.reconnect.base_interval_ms == 0 {
            return Err(invalid("reconnect.base_interval_ms", "must be positive"));
        }
        if self.reconnect.max_interval_ms < self.reconnect.base_interval_ms {
            return Err(invalid(
                "reconnect.max_interval_ms",
                "must not be below base_interval_ms",
            ));
        }
        if self.heartbeat.interval_ms == 0 {
            return Err(invalid("heartbeat.interval_ms", "must be positive"));
        }
        if self.heartbeat.liveness_timeout_ms == Some(0) {
            return Err(invalid("heartbeat.liveness_timeout_ms", "must be positive"));
        }
        let history = &self.history;
        if [
            history.max_indicators,
            history.max_bars,
            history.max_minute_bars,
            history.max_predictions,
            history.max_targets,
        ]
        .contains(&0)
        {
            return Err(invalid("history", "capacities must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_config() {
        let config = load_default_config().unwrap();
        config.validate().unwrap();
        assert_eq!(config.topics.len(), 5);
    }

    #[test]
    fn test_default_endpoint() {
        let config = load_default_config().unwrap();
        let url = config.endpoint.resolve().unwrap();
        assert_eq!(url.as_str(), "ws://localhost:3000/api/market-data-ws");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = load_default_config().unwrap();
        config.topics.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoTopics)));

        let mut config = load_default_config().unwrap();
        config.reconnect.max_interval_ms = 10;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "reconnect.max_interval_ms", .. })
        ));

        let mut config = load_default_config().unwrap();
        config.endpoint.page_origin = None;
        assert!(matches!(config.validate(), Err(ConfigError::MissingEndpoint)));
    }

    #[test]
    fn test_parse_error() {
        let err = load_config_from_str("{ nope").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
