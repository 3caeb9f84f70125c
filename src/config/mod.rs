//! Configuration module
//!
//! Handles:
//! - User configuration (`<config dir>/lazypane/config.toml`)
//! - The validated session configuration merged by `configure`

mod settings;
mod setup;

pub use settings::*;
pub use setup::*;
