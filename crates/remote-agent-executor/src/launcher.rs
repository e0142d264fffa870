//! Open URLs with the OS default handler.

use std::process::Stdio;

use async_trait::async_trait;
use remote_agent_core::{CapabilityError, capability::UrlOpener};
use url::Url;

use crate::shell::resolve_executable_path;

/// Hands URLs to `xdg-open`, `open` or `cmd /C start`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemUrlOpener;

impl SystemUrlOpener {
    /// Launcher program and its leading arguments for this platform.
    const fn launcher() -> Option<(&'static str, &'static [&'static str])> {
        if cfg!(target_os = "windows") {
            // The empty argument is the window title `start` expects.
            Some(("cmd", &["/C", "start", ""]))
        } else if cfg!(target_os = "macos") {
            Some(("open", &[]))
        } else if cfg!(any(
            target_os = "linux",
            target_os = "freebsd",
            target_os = "openbsd",
            target_os = "netbsd"
        )) {
            Some(("xdg-open", &[]))
        } else {
            None
        }
    }
}

#[async_trait]
impl UrlOpener for SystemUrlOpener {
    async fn open_url(&self, url: &str) -> Result<(), CapabilityError> {
        let url = Url::parse(url).map_err(|e| CapabilityError::Failed(format!("invalid url: {e}")))?;
        let Some((program, args)) = Self::launcher() else {
            return Err(CapabilityError::UnsupportedPlatform);
        };
        let executable = resolve_executable_path(program)
            .await
            .ok_or_else(|| CapabilityError::Failed(format!("{program} not found")))?;

        let status = tokio::process::Command::new(executable)
            .args(args)
            .arg(url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        if !status.success() {
            return Err(CapabilityError::CommandFailed {
                status: status.to_string(),
                output: format!("{program} could not open {url}"),
            });
        }
        tracing::info!(%url, "Opened URL");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_invalid_url() {
        let err = SystemUrlOpener.open_url("not a url").await.unwrap_err();
        assert!(err.to_string().starts_with("invalid url"));
    }

    #[test]
    fn test_launcher_known_on_common_platforms() {
        if cfg!(any(target_os = "linux", target_os = "macos", target_os = "windows")) {
            assert!(SystemUrlOpener::launcher().is_some());
        }
    }
}
