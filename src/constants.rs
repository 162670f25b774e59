//! Application-wide constants.
//!
//! Centralized names and defaults to avoid magic strings throughout the codebase.

/// Version reported in the update banner.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A directory only counts as an application root if it holds this file.
pub const APP_FILE: &str = ".platform.app.yaml";

/// Git directory name, skipped while walking the source tree.
pub const GIT_DIR: &str = ".git";

/// First line of every dependency update commit.
pub const COMMIT_MESSAGE: &str = "Auto dependency updates via source operation";

/// Progress spinner tick interval in milliseconds.
pub const PROGRESS_TICK_MS: u64 = 80;

/// Environment variables read at startup.
pub const ENV_SOURCE_DIR: &str = "PLATFORM_SOURCE_DIR";
pub const ENV_PLATFORM_TOKEN: &str = "PLATFORMSH_CLI_TOKEN";
pub const ENV_UPSUN_TOKEN: &str = "UPSUN_CLI_TOKEN";
pub const ENV_UPDATE_BRANCH: &str = "PSH_SOP_UPDATE_BRANCH";
pub const ENV_SOURCE_OPERATION: &str = "PSH_SOP_NAME";
pub const ENV_VENDOR: &str = "VENDOR";

/// Branch targeted for updates when `PSH_SOP_UPDATE_BRANCH` is unset.
pub const DEFAULT_UPDATE_BRANCH: &str = "update";

/// Source operation triggered when `PSH_SOP_NAME` is unset.
pub const DEFAULT_SOURCE_OPERATION: &str = "auto-update";

/// Integration types that mirror a git remote and may prune branches.
pub const GIT_INTEGRATION_TYPES: [&str; 3] = ["github", "gitlab", "bitbucket"];
