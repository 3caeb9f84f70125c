//! Repository root discovery
//!
//! Walks upward from a starting path looking for the repository marker and
//! returns the directory that contains it.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, instrument};

/// Name of the entry that marks a repository root
pub const DEFAULT_MARKER: &str = ".git";

/// Finds the repository root enclosing a path
///
/// Stateless: every call looks at the filesystem as it is right now.
#[derive(Debug, Clone)]
pub struct RootResolver {
    marker: String,
}

impl Default for RootResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl RootResolver {
    /// Resolver looking for `.git`
    pub fn new() -> Self {
        Self::with_marker(DEFAULT_MARKER)
    }

    /// Resolver looking for a custom marker name
    pub fn with_marker(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Return the directory containing the first marker found at or above `start`
    ///
    /// The marker may be a directory or a file (linked worktrees and
    /// submodules carry a `.git` file). `None` means no ancestor has one.
    #[instrument(skip(self), fields(marker = %self.marker))]
    pub fn resolve(&self, start: &Path) -> Option<PathBuf> {
        let start = normalize(start);
        let first = if start.is_file() {
            start
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| start.clone())
        } else {
            start
        };

        let root = first
            .ancestors()
            .find(|dir| dir.join(&self.marker).symlink_metadata().is_ok())
            .map(Path::to_path_buf);

        match &root {
            Some(root) => debug!("Resolved repository root {:?}", root),
            None => debug!("No repository marker above {:?}", first),
        }

        root
    }
}

/// Resolve `start` with the default marker
pub fn resolve(start: &Path) -> Option<PathBuf> {
    RootResolver::new().resolve(start)
}

/// Make `path` absolute and collapse `.` and `..` without touching symlinks
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            // `pop` is a no-op at the root, so `/..` stays `/`
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
