//! Host abstraction
//!
//! The session manager never draws windows or spawns processes itself. It
//! asks a [`Host`] to do so. The tmux-backed implementation lives in
//! [`crate::tmux::TmuxHost`]; tests drive the manager with an in-memory host.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::Result;
use crate::session::{BufferId, ProcessId, WindowId};

/// Lifecycle events a buffer asks the host to react to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferHook {
    /// Focus moved into the buffer
    Enter,
    /// Focus left the buffer
    Leave,
    /// The buffer became visible in a window
    Display,
}

impl BufferHook {
    pub const ALL: [BufferHook; 3] = [BufferHook::Enter, BufferHook::Leave, BufferHook::Display];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Enter => "on-enter",
            Self::Leave => "on-leave",
            Self::Display => "on-display",
        }
    }
}

/// Severity of a user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Warn,
    Error,
}

/// A non-fatal, user-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotifyLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotifyLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotifyLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// What to run inside a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory, always the repository root
    pub cwd: PathBuf,
    /// Optional window title
    pub title: Option<String>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>, cwd: &Path) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: cwd.to_path_buf(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A process started by the host
///
/// `exited` resolves exactly once with the exit code (`None` when the host
/// could not tell, e.g. the buffer was force-deleted). A dropped sender
/// counts as an exit.
#[derive(Debug)]
pub struct SpawnedProcess {
    pub id: ProcessId,
    pub exited: oneshot::Receiver<Option<i32>>,
}

/// Services the host editor/terminal provides to the session manager
#[async_trait]
pub trait Host: Send + Sync + 'static {
    /// Allocate a fresh terminal buffer
    async fn create_buffer(&self) -> Result<BufferId>;

    /// Whether the buffer still exists and is loaded
    async fn buffer_loaded(&self, buffer: BufferId) -> Result<bool>;

    /// Mark the buffer ephemeral and delete it, killing anything inside
    async fn delete_buffer(&self, buffer: BufferId) -> Result<()>;

    /// Ask the host to run its lifecycle behavior for these events
    async fn register_hooks(&self, buffer: BufferId, hooks: &[BufferHook]) -> Result<()>;

    /// The window currently showing the buffer, if any
    async fn window_for_buffer(&self, buffer: BufferId) -> Result<Option<WindowId>>;

    /// Show the buffer in a new window taking `fraction` of the vertical space
    async fn open_window(&self, buffer: BufferId, fraction: f64) -> Result<WindowId>;

    async fn focus_window(&self, window: WindowId) -> Result<()>;

    async fn close_window(&self, window: WindowId) -> Result<()>;

    /// Start `command` inside the buffer
    async fn spawn_process(&self, buffer: BufferId, command: &ProcessCommand)
    -> Result<SpawnedProcess>;

    /// Resolve once the buffer is visible to the user
    async fn wait_visible(&self, buffer: BufferId) -> Result<()>;

    /// Put the terminal cursor where the embedded tool expects it
    async fn reposition_cursor(&self, buffer: BufferId) -> Result<()>;

    /// Stable identifier of the caller's current tab-like grouping
    async fn current_tab(&self) -> Result<String>;

    /// The caller's working directory
    async fn current_dir(&self) -> Result<PathBuf>;

    /// Show a non-fatal message to the user
    async fn notify(&self, notification: Notification);
}
