//! Core session types
//!
//! A `Session` is the buffer + process + last path triple tracked for one
//! `ScopeKey`. Host handles are opaque newtypes; "not allocated" is `None`.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Host identifier of a terminal buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferId(pub u64);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer:{}", self.0)
    }
}

/// Host identifier of a window displaying a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window:{}", self.0)
    }
}

/// Host identifier of a spawned process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessId(pub u32);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid:{}", self.0)
    }
}

/// Key selecting which session an operation applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeKey(String);

impl ScopeKey {
    pub const GLOBAL: &'static str = "global";

    /// The process-wide key
    pub fn global() -> Self {
        Self(Self::GLOBAL.to_string())
    }

    /// Key for one tab-like grouping reported by the host
    pub fn tab(tab_id: &str) -> Self {
        Self(format!("tab:{}", tab_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_global(&self) -> bool {
        self.0 == Self::GLOBAL
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State tracked for one scope
///
/// `process` is only ever set while `buffer` is set. A buffer may outlive its
/// process (created before spawn, or left over after exit).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub buffer: Option<BufferId>,
    pub process: Option<ProcessId>,
    /// Most recently opened repository root, kept across `reset`
    pub last_path: Option<PathBuf>,
    /// When the running process was started
    pub opened_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a buffer or process is allocated
    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some() || self.process.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    /// Nothing allocated and no repository ever recorded
    pub fn is_untouched(&self) -> bool {
        !self.is_allocated() && self.last_path.is_none()
    }

    /// Attach a buffer; any previous process belonged to the old buffer
    pub fn set_buffer(&mut self, buffer: BufferId) {
        if self.buffer != Some(buffer) {
            self.process = None;
            self.opened_at = None;
        }
        self.buffer = Some(buffer);
    }

    /// Record a started process; ignored without a buffer
    pub fn set_process(&mut self, process: ProcessId, root: PathBuf) -> bool {
        if self.buffer.is_none() {
            return false;
        }
        self.process = Some(process);
        self.last_path = Some(root);
        self.opened_at = Some(Utc::now());
        true
    }

    /// Return to "nothing allocated", keeping `last_path`
    pub fn reset(&mut self) {
        self.buffer = None;
        self.process = None;
        self.opened_at = None;
    }

    pub fn snapshot(&self, scope: &ScopeKey) -> SessionSnapshot {
        SessionSnapshot {
            scope: scope.clone(),
            buffer: self.buffer,
            process: self.process,
            last_path: self.last_path.clone(),
            opened_at: self.opened_at,
        }
    }
}

/// Serializable view of one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub scope: ScopeKey,
    pub buffer: Option<BufferId>,
    pub process: Option<ProcessId>,
    pub last_path: Option<PathBuf>,
    pub opened_at: Option<DateTime<Utc>>,
}
