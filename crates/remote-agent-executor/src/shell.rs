//! Cross-platform shell and executable resolution.

use std::path::{Path, PathBuf};

/// Shell named by `$SHELL`, if it is an absolute path to an existing file.
fn user_shell() -> Option<PathBuf> {
    std::env::var_os("SHELL")
        .map(PathBuf::from)
        .filter(|path| is_usable_shell(path))
}

fn is_usable_shell(path: &Path) -> bool {
    path.is_absolute() && path.is_file()
}

/// Program plus the flag that makes it run one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: PathBuf,
    pub flag: &'static str,
}

impl ShellCommand {
    /// The platform shell:
    /// - Windows: `cmd /C`
    /// - Unix-like: `$SHELL -c`, or `/bin/sh -c`
    #[must_use]
    pub fn detect() -> Self {
        if cfg!(windows) {
            Self {
                program: PathBuf::from("cmd"),
                flag: "/C",
            }
        } else {
            Self {
                program: user_shell().unwrap_or_else(|| PathBuf::from("/bin/sh")),
                flag: "-c",
            }
        }
    }

    /// Build a command running `line` through this shell.
    #[must_use]
    pub fn command(&self, line: &str) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.arg(self.flag).arg(line);
        cmd
    }
}

/// Resolve an executable by name.
///
/// Explicit absolute paths are accepted as-is; anything else is looked up on
/// `PATH` via `which` on the blocking pool.
pub async fn resolve_executable_path(executable: &str) -> Option<PathBuf> {
    if executable.trim().is_empty() {
        return None;
    }

    let path = Path::new(executable);
    if path.is_absolute() && path.is_file() {
        return Some(path.to_path_buf());
    }

    let executable = executable.to_string();
    tokio::task::spawn_blocking(move || which::which(executable))
        .await
        .ok()
        .and_then(Result::ok)
}

/// First word of a command line, for logging without arguments.
#[must_use]
pub fn program_name(line: &str) -> String {
    shlex::split(line)
        .and_then(|parts| parts.into_iter().next())
        .unwrap_or_else(|| line.split_whitespace().next().unwrap_or_default().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_must_be_existing_absolute_file() {
        assert!(!is_usable_shell(Path::new("bash")));
        assert!(!is_usable_shell(Path::new("/definitely/not/here/zsh")));
        #[cfg(unix)]
        assert!(is_usable_shell(Path::new("/bin/sh")));
    }

    #[cfg(unix)]
    #[test]
    fn test_detect_unix_shell() {
        let shell = ShellCommand::detect();
        assert_eq!(shell.flag, "-c");
        assert!(shell.program.is_absolute());
    }

    #[test]
    fn test_program_name() {
        assert_eq!(program_name("ls -la /tmp"), "ls");
        assert_eq!(program_name("'my tool' --flag"), "my tool");
        assert_eq!(program_name("echo \"unterminated"), "echo");
        assert_eq!(program_name(""), "");
    }

    #[tokio::test]
    async fn test_resolve_executable_path() {
        assert_eq!(resolve_executable_path("  ").await, None);
        assert_eq!(resolve_executable_path("no-such-binary-on-this-host").await, None);
        #[cfg(unix)]
        assert!(resolve_executable_path("sh").await.is_some());
    }
}
