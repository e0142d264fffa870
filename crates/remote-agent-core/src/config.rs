//! Agent configuration.

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Delay between failed connection attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(10);
/// Delay between reachability probes.
pub const DEFAULT_REACHABILITY_INTERVAL: Duration = Duration::from_secs(30);
/// Deadline for a single shell command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);
/// Outbound frames that may wait for the writer.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported server URL scheme: {0}")]
    UnsupportedScheme(String),
}

/// Runtime configuration for one agent process.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Controller base URL, always ending in `/`.
    pub server_url: Url,
    /// Stable identifier of this agent.
    pub client_id: String,
    pub reconnect_interval: Duration,
    pub reachability_interval: Duration,
    pub command_timeout: Duration,
    pub outbound_capacity: usize,
}

impl AgentConfig {
    /// Create a configuration with default intervals.
    #[must_use]
    pub fn new(server_url: Url, client_id: impl Into<String>) -> Self {
        Self {
            server_url: normalize_base(server_url),
            client_id: client_id.into(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            reachability_interval: DEFAULT_REACHABILITY_INTERVAL,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }

    /// Parse the server URL and create a configuration.
    ///
    /// # Errors
    /// Returns error if the URL is invalid or not http(s).
    pub fn parse(server_url: &str, client_id: impl Into<String>) -> Result<Self, ConfigError> {
        let url = Url::parse(server_url)?;
        match url.scheme() {
            "http" | "https" => Ok(Self::new(url, client_id)),
            other => Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
    }

    #[must_use]
    pub const fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_reachability_interval(mut self, interval: Duration) -> Self {
        self.reachability_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// HTTP endpoint relative to the server URL (`health`, `device`).
    ///
    /// # Errors
    /// Returns error if `path` cannot be joined.
    pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        Ok(self.server_url.join(path)?)
    }

    /// WebSocket URL of the persistent connection.
    ///
    /// # Errors
    /// Returns error if the server scheme has no WebSocket counterpart.
    pub fn websocket_url(&self) -> Result<Url, ConfigError> {
        let scheme = match self.server_url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };
        let mut url = self.server_url.join("client")?;
        url.set_scheme(scheme)
            .map_err(|()| ConfigError::UnsupportedScheme(scheme.to_string()))?;
        Ok(url)
    }
}

fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_keep_base_path() {
        let config = AgentConfig::parse("http://controller:8080/api", "id").unwrap();
        assert_eq!(config.server_url.as_str(), "http://controller:8080/api/");
        assert_eq!(
            config.endpoint("health").unwrap().as_str(),
            "http://controller:8080/api/health"
        );
        assert_eq!(
            config.websocket_url().unwrap().as_str(),
            "ws://controller:8080/api/client"
        );
    }

    #[test]
    fn test_https_maps_to_wss() {
        let config = AgentConfig::parse("https://controller/", "id").unwrap();
        assert_eq!(config.websocket_url().unwrap().as_str(), "wss://controller/client");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            AgentConfig::parse("ftp://controller/", "id"),
            Err(ConfigError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            AgentConfig::parse("not a url", "id"),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::parse("http://c/", "id").unwrap();
        assert_eq!(config.reconnect_interval, Duration::from_secs(10));
        assert_eq!(config.reachability_interval, Duration::from_secs(30));
        assert_eq!(config.with_outbound_capacity(0).outbound_capacity, 1);
    }
}
