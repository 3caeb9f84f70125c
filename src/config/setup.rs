//! Session configuration and the validated setup merge
//!
//! `SessionConfig` is the process-wide configuration the session manager reads
//! on every open. `SetupOptions` is the all-optional input accepted by
//! `SessionConfig::merge`: every provided field is validated first, and only
//! then are the provided fields written over the current values.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default fraction of the available vertical space taken by the window
pub const DEFAULT_WINDOW_FRACTION: f64 = 0.75;

/// Default program launched inside the buffer
pub const DEFAULT_PROGRAM: &str = "lazygit";

/// How many sessions may exist at once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// One session shared process-wide
    #[default]
    Global,
    /// One session per tab-like grouping
    PerTab,
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Scope::Global),
            "per-tab" | "per_tab" | "tab" => Ok(Scope::PerTab),
            other => Err(Error::invalid_config(
                "scope",
                format!("expected 'global' or 'per-tab', got '{}'", other),
            )),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::PerTab => write!(f, "per-tab"),
        }
    }
}

/// Configuration read by the session manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub scope: Scope,

    /// Fraction of available vertical space, within `[0, 1]`
    pub window_fraction: f64,

    /// Program launched with the repository root as its last argument
    pub program: String,

    /// Extra arguments placed before the repository root
    pub args: Vec<String>,

    /// Passed to the program as `--use-config-file <path>`
    pub lazygit_config: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scope: Scope::Global,
            window_fraction: DEFAULT_WINDOW_FRACTION,
            program: DEFAULT_PROGRAM.to_string(),
            args: Vec::new(),
            lazygit_config: None,
        }
    }
}

/// Optional overrides accepted by `configure`
///
/// `scope` stays a string here so that out-of-domain values coming from a
/// config file or the environment are reported instead of failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_fraction: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lazygit_config: Option<PathBuf>,
}

impl SetupOptions {
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_window_fraction(mut self, fraction: f64) -> Self {
        self.window_fraction = Some(fraction);
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl SessionConfig {
    /// Validate `options` and merge the provided fields over `self`
    ///
    /// Nothing is applied unless every provided field is valid.
    pub fn merge(&mut self, options: &SetupOptions) -> Result<()> {
        let scope = options.scope.as_deref().map(Scope::from_str).transpose()?;

        if let Some(fraction) = options.window_fraction {
            validate_fraction(fraction)?;
        }

        if let Some(program) = &options.program {
            if program.trim().is_empty() {
                return Err(Error::invalid_config("program", "must not be empty"));
            }
        }

        if let Some(scope) = scope {
            self.scope = scope;
        }
        if let Some(fraction) = options.window_fraction {
            self.window_fraction = fraction;
        }
        if let Some(program) = &options.program {
            self.program = program.clone();
        }
        if let Some(args) = &options.args {
            self.args = args.clone();
        }
        if let Some(path) = &options.lazygit_config {
            self.lazygit_config = Some(path.clone());
        }

        Ok(())
    }

    /// Arguments for one launch against `root`
    pub fn command_args(&self, root: &std::path::Path) -> Vec<String> {
        let mut args = self.args.clone();
        if let Some(path) = &self.lazygit_config {
            args.push("--use-config-file".to_string());
            args.push(path.display().to_string());
        }
        args.push(root.display().to_string());
        args
    }
}

fn validate_fraction(fraction: f64) -> Result<()> {
    if (0.0..=1.0).contains(&fraction) {
        Ok(())
    } else {
        Err(Error::invalid_config(
            "window_fraction",
            format!("must be within [0, 1], got {}", fraction),
        ))
    }
}
