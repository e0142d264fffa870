//! Command-line and environment configuration.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;
use remote_agent_core::{AgentConfig, config::DEFAULT_OUTBOUND_CAPACITY};

/// Remote agent: keeps a connection to the controller and serves its commands.
#[derive(Parser, Debug)]
#[command(name = "remote-agent", version)]
pub struct Cli {
    /// Controller base URL (http or https).
    #[arg(long, env = "REMOTE_AGENT_SERVER_URL", default_value = "http://127.0.0.1:8080/")]
    pub server_url: String,
    /// Client identifier. Generated and persisted when omitted.
    #[arg(long, env = "REMOTE_AGENT_CLIENT_ID")]
    pub client_id: Option<String>,
    /// File holding the persisted client identifier.
    #[arg(long, env = "REMOTE_AGENT_ID_FILE")]
    pub id_file: Option<PathBuf>,
    /// Seconds between connection attempts.
    #[arg(long, env = "REMOTE_AGENT_RECONNECT_SECS", default_value_t = 10)]
    pub reconnect_secs: u64,
    /// Seconds between reachability probes.
    #[arg(long, env = "REMOTE_AGENT_REACHABILITY_SECS", default_value_t = 30)]
    pub reachability_secs: u64,
    /// Deadline for shell commands, in seconds.
    #[arg(long, env = "REMOTE_AGENT_COMMAND_TIMEOUT_SECS", default_value_t = 60)]
    pub command_timeout_secs: u64,
    /// Outbound frame queue capacity.
    #[arg(long, env = "REMOTE_AGENT_OUTBOUND_CAPACITY", default_value_t = DEFAULT_OUTBOUND_CAPACITY)]
    pub outbound_capacity: usize,
    /// Serve the latest stream payloads on this address.
    #[arg(long, env = "REMOTE_AGENT_VIEWER_ADDR")]
    pub viewer_addr: Option<SocketAddr>,
}

impl Cli {
    /// Build the agent configuration for `client_id`.
    ///
    /// # Errors
    /// Returns error if the server URL is invalid.
    pub fn agent_config(&self, client_id: String) -> anyhow::Result<AgentConfig> {
        Ok(AgentConfig::parse(&self.server_url, client_id)?
            .with_reconnect_interval(Duration::from_secs(self.reconnect_secs))
            .with_reachability_interval(Duration::from_secs(self.reachability_secs))
            .with_command_timeout(Duration::from_secs(self.command_timeout_secs))
            .with_outbound_capacity(self.outbound_capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["remote-agent"]).unwrap();
        let config = cli.agent_config("abc".into()).unwrap();
        assert_eq!(config.reconnect_interval, Duration::from_secs(10));
        assert_eq!(config.reachability_interval, Duration::from_secs(30));
        assert_eq!(config.command_timeout, Duration::from_secs(60));
        assert!(cli.viewer_addr.is_none());
    }

    #[test]
    fn test_flags_override() {
        let cli = Cli::try_parse_from([
            "remote-agent",
            "--server-url",
            "https://controller.example/api",
            "--reconnect-secs",
            "2",
            "--viewer-addr",
            "127.0.0.1:9000",
        ])
        .unwrap();
        let config = cli.agent_config("abc".into()).unwrap();
        assert_eq!(config.reconnect_interval, Duration::from_secs(2));
        assert_eq!(config.server_url.as_str(), "https://controller.example/api/");
        assert_eq!(cli.viewer_addr, Some("127.0.0.1:9000".parse().unwrap()));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let cli = Cli::try_parse_from(["remote-agent", "--server-url", "ftp://x"]).unwrap();
        assert!(cli.agent_config("abc".into()).is_err());
    }
}
