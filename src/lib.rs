//! lazypane - open a git TUI in a split for the repository you are standing in
//!
//! The crate resolves the repository root enclosing a path and keeps one
//! terminal buffer, window and process per scope, driving a host through a
//! small trait so the same lifecycle works against tmux or any other
//! window/terminal system.
//!
//! # Modules
//!
//! - [`repo`] - Repository root discovery and description
//! - [`session`] - Per-scope sessions and the `SessionManager`
//! - [`host`] - The `Host` trait the manager drives
//! - [`tmux`] - tmux-backed `Host` implementation
//! - [`config`] - Setup options and application configuration
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod host;
pub mod repo;
pub mod session;
pub mod tmux;

pub use config::{Config, Scope, SessionConfig, SetupOptions};
pub use error::{Error, Result};
pub use host::{Host, Notification};
pub use repo::RootResolver;
pub use session::{ScopeKey, Session, SessionManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
