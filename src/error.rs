//! Error types for lazypane
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `Display` and `Error` impls.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for lazypane
#[derive(Error, Debug)]
pub enum Error {
    /// No ancestor of the path carries a repository marker
    #[error("Not a repository: {0}")]
    RepositoryNotFound(PathBuf),

    /// A setup option is outside its allowed domain
    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidConfiguration { key: String, reason: String },

    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("Tmux error: {0}")]
    Tmux(#[from] TmuxError),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an `InvalidConfiguration` error
    pub fn invalid_config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Errors reported by a host implementation
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Buffer {0} does not exist")]
    BufferNotFound(u64),

    #[error("Failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },
}

/// Tmux integration errors
#[derive(Error, Debug)]
pub enum TmuxError {
    #[error("Tmux is not installed or not in PATH")]
    NotInstalled,

    #[error("Tmux {found} is too old, {required} or newer is required")]
    UnsupportedVersion { found: String, required: String },

    #[error("Not running inside tmux ($TMUX_PANE is unset)")]
    NotInsideTmux,

    #[error("Tmux command failed: {command} - {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Tmux command timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Failed to parse tmux output: {0}")]
    ParseError(String),

    #[error("Semaphore acquire failed")]
    SemaphoreError,
}

/// Git operations errors
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("Gitoxide error: {0}")]
    Gix(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Failed to create config directory: {0}")]
    DirectoryCreationFailed(PathBuf),
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<gix::open::Error> for GitError {
    fn from(e: gix::open::Error) -> Self {
        GitError::Gix(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::RepositoryNotFound(PathBuf::from("/tmp/standalone.txt"));
        assert!(err.to_string().contains("Not a repository"));
        assert!(err.to_string().contains("/tmp/standalone.txt"));

        let err = Error::invalid_config("window_fraction", "must be within [0, 1], got 1.5");
        assert!(err.to_string().contains("window_fraction"));
        assert!(err.to_string().contains("1.5"));

        let err = TmuxError::NotInstalled;
        assert!(err.to_string().contains("not installed"));
    }

    #[test]
    fn test_error_conversion() {
        let host_err = HostError::BufferNotFound(3);
        let top: Error = host_err.into();
        assert!(matches!(top, Error::Host(_)));
        assert!(top.to_string().contains("Buffer 3"));

        let tmux_err = TmuxError::NotInsideTmux;
        let top: Error = tmux_err.into();
        assert!(matches!(top, Error::Tmux(_)));
    }
}
