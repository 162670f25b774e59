//! Git command wrappers.
//!
//! This module provides a thin wrapper around the git CLI commands the
//! updater needs, running them through a [`CommandRunner`].

use crate::command::{Cmd, CommandRunner};
use anyhow::Context;
use std::path::Path;

fn git(args: &[&str]) -> Cmd {
    Cmd::new("git").args(args.iter().copied())
}

/// Runs an arbitrary git command in `dir` and returns its trimmed stdout.
pub fn run_git(runner: &dyn CommandRunner, dir: &Path, args: &[&str]) -> anyhow::Result<String> {
    let cmd = git(args);
    runner
        .run_checked(&cmd, Some(dir))
        .map(|output| output.trim().to_string())
}

/// Porcelain status of `path`, relative to `dir`. Empty when it is unchanged.
pub fn status_porcelain(
    runner: &dyn CommandRunner,
    dir: &Path,
    path: &str,
) -> anyhow::Result<String> {
    runner
        .run_checked(&git(&["status", "--porcelain=1", "--", path]), Some(dir))
        .context("Failed to check for uncommitted changes")
}

/// Whether `path` is modified, staged or untracked.
pub fn has_changes(runner: &dyn CommandRunner, dir: &Path, path: &str) -> anyhow::Result<bool> {
    Ok(!status_porcelain(runner, dir, path)?.trim().is_empty())
}

pub fn add(runner: &dyn CommandRunner, dir: &Path, path: &str) -> anyhow::Result<()> {
    runner
        .run_checked(&git(&["add", path]), Some(dir))
        .with_context(|| format!("Failed to stage '{}'", path))?;
    Ok(())
}

pub fn commit(runner: &dyn CommandRunner, dir: &Path, message: &str) -> anyhow::Result<()> {
    runner
        .run_checked(&git(&["commit", "-m", message]), Some(dir))
        .context("Failed to commit changes")?;
    Ok(())
}
