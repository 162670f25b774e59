//! Hosting platform CLI wrappers.
//!
//! Each method maps to one CLI invocation. Output parsing lives here so the
//! orchestration in [`crate::trigger`] only deals with typed answers.

use crate::command::{Cmd, CommandOutput, CommandRunner, validate_name};
use crate::constants::GIT_INTEGRATION_TYPES;
use anyhow::Context;

/// What has to happen to the update environment before it can be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchAction {
    /// The environment does not exist yet.
    Create,
    /// The environment exists but is inactive.
    Activate,
    /// The environment is active and only needs its code synced.
    Sync,
}

pub struct PlatformCli<'a> {
    runner: &'a dyn CommandRunner,
    program: &'static str,
}

impl<'a> PlatformCli<'a> {
    pub fn new(runner: &'a dyn CommandRunner, program: &'static str) -> Self {
        Self { runner, program }
    }

    fn cmd(&self, args: &[&str]) -> Cmd {
        Cmd::new(self.program).args(args.iter().copied())
    }

    fn run(&self, args: &[&str]) -> anyhow::Result<CommandOutput> {
        self.runner.run(&self.cmd(args), None)
    }

    pub fn is_installed(&self) -> bool {
        self.runner.is_installed(self.program)
    }

    /// Whether the configured API token is accepted.
    pub fn token_is_valid(&self) -> anyhow::Result<bool> {
        Ok(self.run(&["auth:info"])?.success)
    }

    /// Name of the project's single production environment.
    pub fn production_branch(&self) -> anyhow::Result<String> {
        let output = self.run(&["environment:list", "--type", "production", "--pipe"])?;
        if !output.success || output.trimmed().is_empty() {
            anyhow::bail!(
                "I was unable to retrieve a list of production type branches for this project."
            );
        }
        single_line(output.trimmed())
    }

    pub fn branch_action(&self, branch: &str) -> anyhow::Result<BranchAction> {
        validate_name("branch", branch)?;
        let output = self.run(&["environment:info", "status", "-e", branch])?;
        Ok(action_from_status(&output))
    }

    /// ID of the project's git source integration, if it has one.
    pub fn git_integration_id(&self) -> anyhow::Result<Option<String>> {
        let output = self.run(&[
            "integration:list",
            "--columns=ID,Type",
            "--format=csv",
            "--no-header",
        ])?;
        // A project without integrations makes the listing fail.
        if !output.success {
            return Ok(None);
        }
        Ok(find_git_integration(&output.message))
    }

    /// Whether the integration deletes environments whose branch is missing upstream.
    pub fn prune_branches_enabled(&self, integration: &str) -> anyhow::Result<bool> {
        validate_name("integration", integration)?;
        let cmd = self.cmd(&[
            "integration:get",
            integration,
            "--property",
            "prune_branches",
        ]);
        let value = self
            .runner
            .run_checked(&cmd, None)
            .with_context(|| format!("Retrieving details for integration id {}", integration))?;
        Ok(value.trim() == "true")
    }

    pub fn disable_prune_branches(&self, integration: &str) -> anyhow::Result<()> {
        validate_name("integration", integration)?;
        self.checked(&[
            "integration:update",
            integration,
            "--prune-branches=false",
        ])
    }

    pub fn create_branch(&self, branch: &str, parent: &str) -> anyhow::Result<()> {
        validate_name("branch", branch)?;
        validate_name("branch", parent)?;
        self.checked(&["e:branch", branch, parent, "--no-clone-parent", "--force"])
    }

    pub fn activate_branch(&self, branch: &str) -> anyhow::Result<()> {
        validate_name("branch", branch)?;
        self.checked(&["environment:activate", branch, "--wait", "--yes"])
    }

    pub fn parent_of(&self, branch: &str) -> anyhow::Result<String> {
        validate_name("branch", branch)?;
        let cmd = self.cmd(&["environment:info", "parent", "-e", branch]);
        let parent = self.runner.run_checked(&cmd, None)?;
        Ok(parent.trim().to_string())
    }

    pub fn sync_code(&self, branch: &str) -> anyhow::Result<()> {
        validate_name("branch", branch)?;
        self.checked(&["sync", "-e", branch, "--yes", "--wait", "code"])
    }

    pub fn run_source_operation(&self, operation: &str, branch: &str) -> anyhow::Result<()> {
        validate_name("source operation", operation)?;
        validate_name("branch", branch)?;
        self.checked(&[
            "source-operation:run",
            operation,
            "--environment",
            branch,
            "--wait",
        ])
    }

    /// Deletes the environment but keeps its git branch.
    pub fn deactivate_branch(&self, branch: &str) -> anyhow::Result<()> {
        validate_name("branch", branch)?;
        self.checked(&[
            "e:delete",
            branch,
            "--no-delete-branch",
            "--no-wait",
            "--yes",
        ])
    }

    fn checked(&self, args: &[&str]) -> anyhow::Result<()> {
        self.runner.run_checked(&self.cmd(args), None)?;
        Ok(())
    }
}

fn single_line(output: &str) -> anyhow::Result<String> {
    let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());
    match (lines.next(), lines.next()) {
        (Some(only), None) => Ok(only.to_string()),
        _ => anyhow::bail!(
            "More than one production branch was returned. I was given the following branches:\n{}",
            output
        ),
    }
}

fn action_from_status(output: &CommandOutput) -> BranchAction {
    if !output.success {
        BranchAction::Create
    } else if output.trimmed() == "inactive" {
        BranchAction::Activate
    } else {
        BranchAction::Sync
    }
}

/// First `ID,Type` row whose type is a git hosting integration.
fn find_git_integration(csv: &str) -> Option<String> {
    csv.lines()
        .filter_map(|line| line.split_once(','))
        .map(|(id, kind)| (unquote(id), unquote(kind)))
        .find(|(_, kind)| GIT_INTEGRATION_TYPES.contains(kind))
        .map(|(id, _)| id.to_string())
}

fn unquote(field: &str) -> &str {
    field.trim().trim_matches('"')
}
