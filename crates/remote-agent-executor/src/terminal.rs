//! Shell command execution with a deadline.

use std::{process::Stdio, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use command_group::AsyncCommandGroup;
use remote_agent_core::{CapabilityError, capability::Terminal};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::shell::{ShellCommand, program_name};

/// Runs command lines through the platform shell.
///
/// Each command gets its own process group so the deadline can kill
/// everything it started, not only the shell.
#[derive(Debug, Clone)]
pub struct ShellTerminal {
    shell: ShellCommand,
    deadline: Duration,
}

impl ShellTerminal {
    #[must_use]
    pub fn new(deadline: Duration) -> Self {
        Self {
            shell: ShellCommand::detect(),
            deadline,
        }
    }

    /// Use a specific shell instead of the detected one.
    #[must_use]
    pub fn with_shell(mut self, shell: ShellCommand) -> Self {
        self.shell = shell;
        self
    }
}

#[async_trait]
impl Terminal for ShellTerminal {
    async fn run(&self, line: &str) -> Result<Bytes, CapabilityError> {
        let mut cmd = self.shell.command(line);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.group_spawn()?;
        let stdout = child.inner().stdout.take();
        let stderr = child.inner().stderr.take();
        tracing::debug!(program = %program_name(line), "Running shell command");

        let finished = tokio::time::timeout(self.deadline, async {
            let (out, err) = tokio::try_join!(read_all(stdout), read_all(stderr))?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, out, err))
        })
        .await;

        let Ok(finished) = finished else {
            tracing::warn!(program = %program_name(line), deadline = ?self.deadline, "Shell command timed out");
            if let Err(e) = child.kill().await {
                tracing::debug!(error = %e, "Failed to kill process group");
            }
            return Err(CapabilityError::DeadlineExceeded);
        };

        let (status, mut output, err) = finished?;
        output.extend_from_slice(&err);
        if status.success() {
            Ok(Bytes::from(output))
        } else {
            Err(CapabilityError::CommandFailed {
                status: status.to_string(),
                output: String::from_utf8_lossy(&output).trim_end().to_string(),
            })
        }
    }
}

async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn terminal(deadline: Duration) -> ShellTerminal {
        ShellTerminal::new(deadline).with_shell(ShellCommand {
            program: "/bin/sh".into(),
            flag: "-c",
        })
    }

    #[tokio::test]
    async fn test_combined_output() {
        let output = terminal(Duration::from_secs(5))
            .run("echo out; echo err 1>&2")
            .await
            .unwrap();
        assert_eq!(output.as_ref(), b"out\nerr\n");
    }

    #[tokio::test]
    async fn test_failure_carries_status_and_output() {
        let err = terminal(Duration::from_secs(5))
            .run("echo broken; exit 3")
            .await
            .unwrap_err();
        match err {
            CapabilityError::CommandFailed { status, output } => {
                assert!(status.contains('3'), "status was {status}");
                assert_eq!(output, "broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deadline_kills_command() {
        let started = std::time::Instant::now();
        let err = terminal(Duration::from_millis(200))
            .run("sleep 30")
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::DeadlineExceeded));
        assert_eq!(err.to_string(), "command deadline exceeded");
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
