//! Async tmux integration module
//!
//! - `TmuxExecutor` - Semaphore-controlled async command execution
//! - `TmuxHost` - `Host` implementation backed by tmux panes

mod executor;
mod host;

pub use executor::*;
pub use host::*;
