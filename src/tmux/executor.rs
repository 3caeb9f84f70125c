//! Async tmux command executor with semaphore-controlled concurrency
//!
//! Provides non-blocking tmux command execution with:
//! - Semaphore to limit concurrent commands (default: 16)
//! - Timeout handling
//! - Version checking

use std::process::Stdio;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result, TmuxError};

/// Default maximum concurrent tmux commands
pub const DEFAULT_MAX_CONCURRENT: usize = 16;

/// Default command timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Oldest tmux accepting `join-pane -l <n>%`
pub const MIN_VERSION: (u32, u32) = (3, 1);

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)").unwrap());

/// Extract `(major, minor)` from `tmux -V` output such as `tmux 3.3a`
pub fn parse_version(output: &str) -> Option<(u32, u32)> {
    let caps = VERSION_PATTERN.captures(output)?;
    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps.get(2)?.as_str().parse().ok()?;
    Some((major, minor))
}

/// Async tmux command executor
///
/// Uses a semaphore to limit concurrent tmux commands; the exit watchers
/// poll tmux in the background alongside user-driven commands.
#[derive(Clone)]
pub struct TmuxExecutor {
    /// Semaphore for concurrency control
    semaphore: Arc<Semaphore>,
    /// Command timeout
    timeout: Duration,
}

impl TmuxExecutor {
    /// Create a new executor with default settings
    pub fn new() -> Self {
        Self::with_max_concurrent(DEFAULT_MAX_CONCURRENT)
    }

    /// Create an executor with custom concurrency limit
    pub fn with_max_concurrent(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the command timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that tmux is installed and recent enough
    pub async fn check_installed(&self) -> Result<()> {
        let output = Command::new("tmux")
            .arg("-V")
            .output()
            .await
            .map_err(|_| TmuxError::NotInstalled)?;

        if !output.status.success() {
            return Err(TmuxError::NotInstalled.into());
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("tmux version: {}", version);

        match parse_version(&version) {
            Some(found) if found >= MIN_VERSION => Ok(()),
            Some(_) => Err(TmuxError::UnsupportedVersion {
                found: version,
                required: format!("{}.{}", MIN_VERSION.0, MIN_VERSION.1),
            }
            .into()),
            None => Err(TmuxError::ParseError(format!("unrecognized version '{}'", version)).into()),
        }
    }

    /// Execute a tmux command and return its output
    #[instrument(skip(self), fields(args = ?args))]
    pub async fn execute(&self, args: &[&str]) -> Result<String> {
        // Acquire semaphore permit
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| TmuxError::SemaphoreError)?;

        let mut cmd = Command::new("tmux");
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let result = timeout(self.timeout, cmd.output()).await;

        match result {
            Ok(Ok(output)) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                    Err(TmuxError::CommandFailed {
                        command: format!("tmux {}", args.join(" ")),
                        stderr,
                    }
                    .into())
                }
            }
            Ok(Err(e)) => {
                warn!("tmux command failed: {}", e);
                Err(TmuxError::CommandFailed {
                    command: format!("tmux {}", args.join(" ")),
                    stderr: e.to_string(),
                }
                .into())
            }
            Err(_) => Err(TmuxError::Timeout(self.timeout).into()),
        }
    }

    /// Expand a format string against `target`
    pub async fn display(&self, target: &str, format: &str) -> Result<String> {
        let output = self
            .execute(&["display-message", "-p", "-t", target, format])
            .await?;
        Ok(output.trim().to_string())
    }

    /// Like `display`, but `None` when the target does not exist
    ///
    /// tmux exits 0 with no output for a missing pane target, so an empty
    /// expansion counts as missing too. Only use it with formats that never
    /// expand to an empty string for a live target.
    pub async fn try_display(&self, target: &str, format: &str) -> Result<Option<String>> {
        match self.display(target, format).await {
            Ok(out) if out.is_empty() => Ok(None),
            Ok(out) => Ok(Some(out)),
            Err(Error::Tmux(TmuxError::CommandFailed { .. })) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Check if a tmux session exists
    pub async fn session_exists(&self, session_name: &str) -> Result<bool> {
        let result = self.execute(&["has-session", "-t", session_name]).await;
        match result {
            Ok(_) => Ok(true),
            // "has-session" returns non-zero if session doesn't exist
            Err(Error::Tmux(TmuxError::CommandFailed { .. })) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Kill a tmux session
    pub async fn kill_session(&self, session_name: &str) -> Result<()> {
        self.execute(&["kill-session", "-t", session_name]).await?;
        Ok(())
    }
}

impl Default for TmuxExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_executor_creation() {
        let executor = TmuxExecutor::new();
        assert_eq!(executor.timeout, DEFAULT_TIMEOUT);
        assert_eq!(executor.semaphore.available_permits(), DEFAULT_MAX_CONCURRENT);
    }

    #[tokio::test]
    async fn test_executor_with_custom_settings() {
        let executor = TmuxExecutor::with_max_concurrent(0).with_timeout(Duration::from_secs(10));

        assert_eq!(executor.timeout, Duration::from_secs(10));
        assert_eq!(executor.semaphore.available_permits(), 1);
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("tmux 3.3a"), Some((3, 3)));
        assert_eq!(parse_version("tmux next-3.4"), Some((3, 4)));
        assert_eq!(parse_version("tmux 2.9"), Some((2, 9)));
        assert_eq!(parse_version("tmux master"), None);
        assert!(parse_version("tmux 3.0").unwrap() < MIN_VERSION);
        assert!(parse_version("tmux 3.1c").unwrap() >= MIN_VERSION);
    }

    // Tests talking to a live tmux server are in tests/tmux_test.rs
}
