//! Repository discovery
//!
//! - `RootResolver` - Upward search for the repository marker
//! - `RepoInfo` - Name and branch of a resolved root via gitoxide

mod info;
mod resolver;

pub use info::*;
pub use resolver::*;
