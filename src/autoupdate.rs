//! Dependency update flow run inside the source operation container.
//!
//! Finds every dependency manifest under the source directory, runs its
//! updater, stages lock files that changed, and commits them in one go.

use crate::command::CommandRunner;
use crate::constants::{APP_VERSION, COMMIT_MESSAGE};
use crate::discover;
use crate::git;
use crate::updaters::Updater;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStep {
    Started,
    Discovering,
    FoundManifest { manifest: PathBuf },
    RunningUpdater { command: String },
    CheckingStatus,
    NoChanges { lock: PathBuf },
    Staging { lock: PathBuf },
    Committing,
    NothingToCommit,
    Completed,
}

impl UpdateStep {
    /// Short name of the action, used as the headline when the step fails.
    pub fn event(&self) -> String {
        match self {
            UpdateStep::Started | UpdateStep::Completed => "Dependency update".to_string(),
            UpdateStep::Discovering | UpdateStep::FoundManifest { .. } => {
                "Gathering dependency definition file(s)".to_string()
            }
            UpdateStep::RunningUpdater { command } => command.clone(),
            UpdateStep::CheckingStatus | UpdateStep::NoChanges { .. } => "git status".to_string(),
            UpdateStep::Staging { .. } => "git add".to_string(),
            UpdateStep::Committing | UpdateStep::NothingToCommit => "git commit".to_string(),
        }
    }
}

impl fmt::Display for UpdateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateStep::Started => write!(
                f,
                "Beginning update process using version {} of updater...",
                APP_VERSION
            ),
            UpdateStep::Discovering => write!(f, "Looking for dependency definition files..."),
            UpdateStep::FoundManifest { manifest } => {
                let name = manifest.file_name().unwrap_or(manifest.as_os_str());
                write!(f, "Found a {} file...", name.to_string_lossy())
            }
            UpdateStep::RunningUpdater { command } => write!(f, "Running {}", command),
            UpdateStep::CheckingStatus => write!(f, "Seeing if there are any updates to commit."),
            UpdateStep::NoChanges { lock } => write!(
                f,
                "No updates available for {}, nothing to commit.",
                lock.display()
            ),
            UpdateStep::Staging { lock } => {
                write!(f, "Updates are available, adding {}...", lock.display())
            }
            UpdateStep::Committing => write!(f, "Committing updated lock files..."),
            UpdateStep::NothingToCommit => write!(f, "No updates available, nothing to commit."),
            UpdateStep::Completed => write!(f, "Changes successfully committed."),
        }
    }
}

/// Receives progress notifications while the update runs.
pub trait UpdateCallbacks {
    fn on_step(&self, step: &UpdateStep);
    fn on_complete(&self, _result: &UpdateResult) {}
}

#[derive(Debug)]
pub struct UpdateResult {
    pub path: PathBuf,
    pub outcome: UpdateOutcome,
    pub duration: Duration,
}

impl UpdateResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, UpdateOutcome::Success(_))
    }
}

#[derive(Debug)]
struct UpdateError {
    source: anyhow::Error,
    step: UpdateStep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSuccess {
    /// Manifests that were updated, relative to the source directory.
    pub manifests: Vec<PathBuf>,
    /// Lock files that changed and were committed.
    pub committed_locks: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFailure {
    pub error: String,
    pub step: UpdateStep,
}

#[derive(Debug)]
pub enum UpdateOutcome {
    Success(UpdateSuccess),
    Failed(UpdateFailure),
}

fn at_step<T>(step: &UpdateStep, result: anyhow::Result<T>) -> Result<T, UpdateError> {
    result.map_err(|e| UpdateError {
        source: e,
        step: step.clone(),
    })
}

fn step<C>(callbacks: &C, step: UpdateStep) -> UpdateStep
where
    C: UpdateCallbacks + ?Sized,
{
    callbacks.on_step(&step);
    step
}

/// Runs the whole update against `source_dir`.
pub fn update<C>(runner: &dyn CommandRunner, source_dir: &Path, callbacks: &C) -> UpdateResult
where
    C: UpdateCallbacks + ?Sized,
{
    let start = Instant::now();
    let outcome = match do_update(runner, source_dir, callbacks) {
        Ok(success) => UpdateOutcome::Success(success),
        Err(e) => UpdateOutcome::Failed(UpdateFailure {
            error: format!("{:#}", e.source),
            step: e.step,
        }),
    };

    let result = UpdateResult {
        path: source_dir.to_path_buf(),
        outcome,
        duration: start.elapsed(),
    };
    callbacks.on_complete(&result);
    result
}

fn do_update<C>(
    runner: &dyn CommandRunner,
    source_dir: &Path,
    callbacks: &C,
) -> Result<UpdateSuccess, UpdateError>
where
    C: UpdateCallbacks + ?Sized,
{
    step(callbacks, UpdateStep::Started);

    let discovering = step(callbacks, UpdateStep::Discovering);
    let manifests = at_step(
        &discovering,
        discover::find_dependency_files(source_dir),
    )?;
    if manifests.is_empty() {
        return at_step(
            &discovering,
            Err(anyhow::anyhow!(
                "I was unable to locate any dependency definition files"
            )),
        );
    }

    let mut message = COMMIT_MESSAGE.to_string();
    let mut staged = Vec::new();

    for manifest in &manifests {
        let found = step(
            callbacks,
            UpdateStep::FoundManifest {
                manifest: manifest.clone(),
            },
        );
        let updater = at_step(&found, updater_for(manifest))?;
        let manifest_dir = manifest.parent().unwrap_or(Path::new(""));

        let cmd = updater.cmd();
        let running = step(
            callbacks,
            UpdateStep::RunningUpdater {
                command: cmd.to_string(),
            },
        );
        let output = at_step(&running, runner.run(&cmd, Some(&source_dir.join(manifest_dir))))?;
        if !output.success {
            return at_step(&running, Err(anyhow::anyhow!("{}", output.message.trim_end())));
        }

        let lock = manifest_dir.join(updater.lock);
        let lock_str = lock.to_string_lossy();

        let checking = step(callbacks, UpdateStep::CheckingStatus);
        if !at_step(&checking, git::has_changes(runner, source_dir, &lock_str))? {
            step(callbacks, UpdateStep::NoChanges { lock: lock.clone() });
            continue;
        }

        let staging = step(callbacks, UpdateStep::Staging { lock: lock.clone() });
        at_step(&staging, git::add(runner, source_dir, &lock_str))?;
        message.push_str(&format!("\nAdded updated {}", lock_str));
        staged.push(lock);
    }

    if staged.is_empty() {
        step(callbacks, UpdateStep::NothingToCommit);
        return Ok(UpdateSuccess {
            manifests,
            committed_locks: staged,
        });
    }

    let committing = step(callbacks, UpdateStep::Committing);
    at_step(&committing, git::commit(runner, source_dir, &message))?;
    step(callbacks, UpdateStep::Completed);

    Ok(UpdateSuccess {
        manifests,
        committed_locks: staged,
    })
}

fn updater_for(manifest: &Path) -> anyhow::Result<&'static Updater> {
    manifest
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(Updater::for_manifest)
        .ok_or_else(|| anyhow::anyhow!("No updater known for {}", manifest.display()))
}
