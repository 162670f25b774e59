//! Runtime configuration: CLI verbosity plus the environment variables the
//! source operation container provides.

use crate::command::{self, CommandLogger};
use crate::constants::{
    DEFAULT_SOURCE_OPERATION, DEFAULT_UPDATE_BRANCH, ENV_PLATFORM_TOKEN, ENV_SOURCE_DIR,
    ENV_SOURCE_OPERATION, ENV_UPDATE_BRANCH, ENV_UPSUN_TOKEN, ENV_VENDOR,
};
use std::path::PathBuf;

/// Runtime configuration derived from CLI arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    /// Controls the verbosity level of CLI output.
    pub verbosity: Verbosity,
    /// Skip confirmation prompts even when attached to a terminal.
    pub assume_yes: bool,
}

impl Config {
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Returns the command logger matching the verbosity setting.
    #[must_use]
    pub fn command_logger(&self) -> CommandLogger {
        if self.is_verbose() {
            command::verbose_logger
        } else {
            command::no_op_logger
        }
    }
}

/// Verbosity level for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

/// Hosting vendor whose CLI drives the environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Vendor {
    #[default]
    Platform,
    Upsun,
}

impl Vendor {
    fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("upsun") {
            Vendor::Upsun
        } else {
            Vendor::Platform
        }
    }

    pub fn cli_program(&self) -> &'static str {
        match self {
            Vendor::Platform => "platform",
            Vendor::Upsun => "upsun",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Vendor::Platform => "Platform.sh",
            Vendor::Upsun => "Upsun",
        }
    }

    /// Environment variables, in lookup order, that may hold the CLI API token.
    pub fn token_vars(&self) -> &'static [&'static str] {
        match self {
            Vendor::Platform => &[ENV_PLATFORM_TOKEN],
            Vendor::Upsun => &[ENV_UPSUN_TOKEN, ENV_PLATFORM_TOKEN],
        }
    }
}

/// Values read from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Checked-out application source; falls back to the working directory.
    pub source_dir: Option<PathBuf>,
    /// Whether one of the vendor's token variables is set. A variable set to an
    /// empty string counts as missing.
    pub has_cli_token: bool,
    pub update_branch: String,
    pub source_operation: String,
    pub vendor: Vendor,
}

impl Environment {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the environment from an arbitrary lookup, treating empty values as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let vendor = get(ENV_VENDOR)
            .map(|v| Vendor::from_name(&v))
            .unwrap_or_default();

        Self {
            source_dir: get(ENV_SOURCE_DIR).map(PathBuf::from),
            has_cli_token: vendor.token_vars().iter().any(|&var| get(var).is_some()),
            update_branch: get(ENV_UPDATE_BRANCH)
                .unwrap_or_else(|| DEFAULT_UPDATE_BRANCH.to_string()),
            source_operation: get(ENV_SOURCE_OPERATION)
                .unwrap_or_else(|| DEFAULT_SOURCE_OPERATION.to_string()),
            vendor,
        }
    }
}
