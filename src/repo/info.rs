//! Repository description using pure gitoxide

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::error::{GitError, Result};

/// Name and branch of a resolved repository root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    pub root: PathBuf,
    pub name: String,
    pub branch: String,
}

impl RepoInfo {
    /// Open the repository at `root` and describe it
    #[instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn inspect(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        let repo = gix::open(&root).map_err(|e| {
            if e.to_string().contains("not a git repository") {
                GitError::NotARepository(root.clone())
            } else {
                GitError::from(e)
            }
        })?;

        let branch = current_branch(&repo)?;
        let name = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        debug!("Inspected repository '{}' on {}", name, branch);

        Ok(Self { root, name, branch })
    }

    /// Short label for window titles
    pub fn title(&self) -> String {
        format!("{} [{}]", self.name, self.branch)
    }
}

fn current_branch(repo: &gix::Repository) -> Result<String> {
    let head = repo.head().map_err(|e| GitError::Gix(e.to_string()))?;

    match head.kind {
        gix::head::Kind::Symbolic(reference) => Ok(reference.name.shorten().to_string()),
        gix::head::Kind::Detached { .. } => match head.id() {
            Some(id) => {
                let id_str = id.to_string();
                let short = if id_str.len() > 8 { &id_str[..8] } else { &id_str };
                Ok(format!("HEAD detached at {}", short))
            }
            None => Ok("HEAD (no commits)".to_string()),
        },
        gix::head::Kind::Unborn(full_name) => Ok(full_name.shorten().to_string()),
    }
}
