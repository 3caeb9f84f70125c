//! Session management module
//!
//! - `Session` - Buffer, process and last path tracked per scope key
//! - `SessionManager` - Open / drop / toggle over a `Host`

mod manager;
mod types;

pub use manager::*;
pub use types::*;
