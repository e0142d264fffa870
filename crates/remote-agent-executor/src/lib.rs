//! Host capability implementations.
//!
//! Provides:
//! - `ShellTerminal` - Shell commands in their own process group, with a deadline
//! - `LocalFileSystem` - Directory listing and file transfer
//! - `SystemDeviceInfo` - Host description via `sysinfo`
//! - `SystemUrlOpener` - OS default URL handler
//!
//! Capture, clipboard, power and persistence are left unsupported.

pub mod device;
pub mod filesystem;
pub mod launcher;
pub mod shell;
pub mod terminal;

use remote_agent_core::{AgentConfig, Capabilities};

pub use device::SystemDeviceInfo;
pub use filesystem::LocalFileSystem;
pub use launcher::SystemUrlOpener;
pub use shell::{ShellCommand, resolve_executable_path};
pub use terminal::ShellTerminal;

/// Capabilities backed by this host.
#[must_use]
pub fn host_capabilities(config: &AgentConfig) -> Capabilities {
    Capabilities::unsupported()
        .with_terminal(ShellTerminal::new(config.command_timeout))
        .with_filesystem(LocalFileSystem)
        .with_device(SystemDeviceInfo)
        .with_url_opener(SystemUrlOpener)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_host_capabilities() {
        let config = AgentConfig::parse("http://127.0.0.1:8080", "host")
            .unwrap()
            .with_command_timeout(Duration::from_secs(5));
        let caps = host_capabilities(&config);

        assert!(caps.device.device_specs().await.is_ok());
        let err = caps.clipboard.read_text().await.unwrap_err();
        assert_eq!(err.to_string(), "unsupported platform");
    }
}
