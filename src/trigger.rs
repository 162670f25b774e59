//! Update branch orchestration.
//!
//! Prepares the update environment (create, activate or sync it from
//! production), runs the auto-update source operation against it, then puts
//! the environment back the way it was found.

use crate::command::CommandRunner;
use crate::config::{Environment, Vendor};
use crate::constants::APP_FILE;
use crate::platform::{BranchAction, PlatformCli};
use anyhow::Context;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerStep {
    Started,
    CheckingToken { vendor: Vendor },
    CheckingCli { vendor: Vendor },
    CheckingTokenValidity { vendor: Vendor },
    FetchingProductionBranch,
    CheckingBranch { branch: String },
    CheckingIntegration,
    DisablingPruneBranches { integration: String },
    CreatingBranch { branch: String, parent: String },
    ActivatingBranch { branch: String },
    ValidatingParent { branch: String, parent: String },
    SyncingBranch { branch: String, parent: String },
    RunningSourceOperation { operation: String, branch: String },
    DeactivatingBranch { branch: String },
    LeavingBranchActive { branch: String },
    Completed { branch: String },
}

impl TriggerStep {
    /// Headline reported when the step fails.
    pub fn event(&self) -> String {
        match self {
            TriggerStep::Started | TriggerStep::Completed { .. } => {
                "Auto update trigger".to_string()
            }
            TriggerStep::CheckingToken { .. }
            | TriggerStep::CheckingCli { .. }
            | TriggerStep::CheckingTokenValidity { .. } => self.to_string(),
            TriggerStep::FetchingProductionBranch => {
                "Retrieving production environments".to_string()
            }
            TriggerStep::CheckingBranch { branch } => {
                format!("Retrieving status of environment {}", branch)
            }
            TriggerStep::CheckingIntegration => "Retrieving git integrations".to_string(),
            TriggerStep::DisablingPruneBranches { integration } => format!(
                "Trying to update 'prune_branches' to false on git integration {}",
                integration
            ),
            TriggerStep::CreatingBranch { branch, .. } => {
                format!("Failure creating environment {}", branch)
            }
            TriggerStep::ActivatingBranch { branch } => format!("Activating branch {}", branch),
            TriggerStep::ValidatingParent { branch, parent } => format!(
                "Update Branch {} is not a direct descendant of {}",
                branch, parent
            ),
            TriggerStep::SyncingBranch { branch, parent } => {
                format!("Failed to sync branch {} with {}", branch, parent)
            }
            TriggerStep::RunningSourceOperation { operation, branch } => format!(
                "Running source operation '{}' against environment '{}'",
                operation, branch
            ),
            TriggerStep::DeactivatingBranch { branch } => {
                format!("Deactivating environment {}", branch)
            }
            TriggerStep::LeavingBranchActive { branch } => {
                format!("Leaving environment {} active", branch)
            }
        }
    }

    /// Confirmation printed once the step has succeeded, if it warrants one.
    pub fn done_message(&self) -> Option<String> {
        match self {
            TriggerStep::CheckingToken { vendor } => Some(format!(
                "{} CLI API token is available.",
                vendor.display_name()
            )),
            TriggerStep::CheckingCli { vendor } => Some(format!(
                "The {} CLI tool is installed.",
                vendor.display_name()
            )),
            TriggerStep::CheckingTokenValidity { vendor } => Some(format!(
                "{} CLI API token is valid.",
                vendor.display_name()
            )),
            TriggerStep::DisablingPruneBranches { .. } => {
                Some("'prune_branches' disabled".to_string())
            }
            TriggerStep::CreatingBranch { .. } => Some("Environment created.".to_string()),
            TriggerStep::ActivatingBranch { .. } => Some("Environment activated.".to_string()),
            TriggerStep::SyncingBranch { .. } => Some("Syncing complete.".to_string()),
            TriggerStep::RunningSourceOperation { .. } => {
                Some("Source operation completed.".to_string())
            }
            TriggerStep::DeactivatingBranch { branch } => {
                Some(format!("Environment {} deactivated", branch))
            }
            _ => None,
        }
    }
}

impl fmt::Display for TriggerStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerStep::Started => {
                write!(f, "Beginning set up to perform the source operation update...")
            }
            TriggerStep::CheckingToken { vendor } => {
                write!(f, "Checking for the {} CLI API token", vendor.display_name())
            }
            TriggerStep::CheckingCli { vendor } => {
                write!(f, "Checking for the {} CLI tool", vendor.display_name())
            }
            TriggerStep::CheckingTokenValidity { vendor } => write!(
                f,
                "Checking for the {} CLI API token validity",
                vendor.display_name()
            ),
            TriggerStep::FetchingProductionBranch => write!(f, "Retrieving production environments"),
            TriggerStep::CheckingBranch { branch } => {
                write!(f, "Checking the status of environment {}...", branch)
            }
            TriggerStep::CheckingIntegration => {
                write!(f, "Checking for a git integration on this project...")
            }
            TriggerStep::DisablingPruneBranches { integration } => write!(
                f,
                "Disabling 'prune_branches' on git integration {}...",
                integration
            ),
            TriggerStep::CreatingBranch { branch, parent } => write!(
                f,
                "Your update branch '{}' does not exist so I need to create it from {}...",
                branch, parent
            ),
            TriggerStep::ActivatingBranch { branch } => write!(f, "Activating branch {}...", branch),
            TriggerStep::ValidatingParent { branch, parent } => write!(
                f,
                "Verifying {} is a direct descendant of {}...",
                branch, parent
            ),
            TriggerStep::SyncingBranch { branch, parent } => {
                write!(f, "Syncing branch {} with {}...", branch, parent)
            }
            TriggerStep::RunningSourceOperation { operation, branch } => write!(
                f,
                "Running source operation '{}' against environment '{}'...",
                operation, branch
            ),
            TriggerStep::DeactivatingBranch { branch } => write!(
                f,
                "{} branch was inactive previously so we will deactivate it.",
                branch
            ),
            TriggerStep::LeavingBranchActive { branch } => write!(
                f,
                "{} was previously active so we'll leave it alone.",
                branch
            ),
            TriggerStep::Completed { branch } => {
                write!(f, "Auto update of {} environment complete.", branch)
            }
        }
    }
}

/// Receives progress notifications while the trigger runs.
pub trait TriggerCallbacks {
    fn on_step(&self, step: &TriggerStep);
    fn on_done(&self, _message: &str) {}
    fn on_warning(&self, message: &str);
    /// Asks before changing project settings. Non-interactive callers accept.
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
    fn on_complete(&self, _result: &TriggerResult) {}
}

/// State of the update environment before the trigger touched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviousStatus {
    Inactive,
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSuccess {
    pub production_branch: String,
    pub update_branch: String,
    pub action: BranchAction,
    pub previous_status: PreviousStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerFailure {
    pub error: String,
    pub step: TriggerStep,
}

#[derive(Debug)]
pub enum TriggerOutcome {
    Success(TriggerSuccess),
    Failed(TriggerFailure),
}

#[derive(Debug)]
pub struct TriggerResult {
    pub outcome: TriggerOutcome,
    pub duration: Duration,
}

impl TriggerResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TriggerOutcome::Success(_))
    }
}

#[derive(Debug)]
struct TriggerError {
    source: anyhow::Error,
    step: TriggerStep,
}

fn at_step<T>(step: &TriggerStep, result: anyhow::Result<T>) -> Result<T, TriggerError> {
    result.map_err(|e| TriggerError {
        source: e,
        step: step.clone(),
    })
}

fn fail<T>(step: &TriggerStep, message: String) -> Result<T, TriggerError> {
    at_step(step, Err(anyhow::Error::msg(message)))
}

/// Walks a flow's steps, reporting each one to the callbacks.
struct Flow<'a, C: ?Sized> {
    callbacks: &'a C,
}

impl<C> Flow<'_, C>
where
    C: TriggerCallbacks + ?Sized,
{
    fn begin(&self, step: TriggerStep) -> TriggerStep {
        self.callbacks.on_step(&step);
        step
    }

    fn done(&self, step: &TriggerStep) {
        if let Some(message) = step.done_message() {
            self.callbacks.on_done(&message);
        }
    }
}

/// Prepares the update environment and runs the source operation on it.
pub fn trigger<C>(runner: &dyn CommandRunner, env: &Environment, callbacks: &C) -> TriggerResult
where
    C: TriggerCallbacks + ?Sized,
{
    let start = Instant::now();
    let outcome = match do_trigger(runner, env, callbacks) {
        Ok(success) => TriggerOutcome::Success(success),
        Err(e) => TriggerOutcome::Failed(TriggerFailure {
            error: format!("{:#}", e.source),
            step: e.step,
        }),
    };

    let result = TriggerResult {
        outcome,
        duration: start.elapsed(),
    };
    callbacks.on_complete(&result);
    result
}

fn do_trigger<C>(
    runner: &dyn CommandRunner,
    env: &Environment,
    callbacks: &C,
) -> Result<TriggerSuccess, TriggerError>
where
    C: TriggerCallbacks + ?Sized,
{
    let vendor = env.vendor;
    let flow = Flow { callbacks };
    let cli = PlatformCli::new(runner, vendor.cli_program());

    flow.begin(TriggerStep::Started);
    verify_cli(&flow, &cli, env)?;

    let fetching = flow.begin(TriggerStep::FetchingProductionBranch);
    let production = at_step(&fetching, cli.production_branch())?;

    let update_branch = env.update_branch.clone();
    let checking = flow.begin(TriggerStep::CheckingBranch {
        branch: update_branch.clone(),
    });
    let action = at_step(&checking, cli.branch_action(&update_branch))?;

    let mut previous_status = PreviousStatus::Inactive;
    match action {
        BranchAction::Create => {
            let creating = flow.begin(TriggerStep::CreatingBranch {
                branch: update_branch.clone(),
                parent: production.clone(),
            });
            guard_prune_branches(&flow, &cli, &update_branch)?;

            at_step(
                &creating,
                cli.create_branch(&update_branch, &production).with_context(|| {
                    format!(
                        "I encountered an error while attempting to create the branch {}. \
                         Please check the activity log to see why creation failed",
                        update_branch
                    )
                }),
            )?;
            flow.done(&creating);
        }
        BranchAction::Activate | BranchAction::Sync => {
            if action == BranchAction::Activate {
                let activating = flow.begin(TriggerStep::ActivatingBranch {
                    branch: update_branch.clone(),
                });
                at_step(
                    &activating,
                    cli.activate_branch(&update_branch).with_context(|| {
                        format!(
                            "I encountered an error while attempting to activate the branch {}. \
                             Please check the activity log to see why activation failed",
                            update_branch
                        )
                    }),
                )?;
                flow.done(&activating);
            } else {
                previous_status = PreviousStatus::Active;
            }

            validate_parent(&flow, &cli, &update_branch, &production)?;

            let syncing = flow.begin(TriggerStep::SyncingBranch {
                branch: update_branch.clone(),
                parent: production.clone(),
            });
            at_step(
                &syncing,
                cli.sync_code(&update_branch).with_context(|| {
                    format!(
                        "I was unable to sync the environment {} with {}. \
                         You will need to examine the logs to find out why",
                        update_branch, production
                    )
                }),
            )?;
            flow.done(&syncing);
        }
    }

    let running = flow.begin(TriggerStep::RunningSourceOperation {
        operation: env.source_operation.clone(),
        branch: update_branch.clone(),
    });
    at_step(
        &running,
        cli.run_source_operation(&env.source_operation, &update_branch),
    )?;
    flow.done(&running);

    match previous_status {
        PreviousStatus::Inactive => {
            let deactivating = flow.begin(TriggerStep::DeactivatingBranch {
                branch: update_branch.clone(),
            });
            // The update already landed; a failed clean-up is only worth a warning.
            match cli.deactivate_branch(&update_branch) {
                Ok(()) => flow.done(&deactivating),
                Err(e) => callbacks.on_warning(&format!(
                    "{} command failed! {:#}",
                    deactivating.event(),
                    e
                )),
            }
        }
        PreviousStatus::Active => {
            flow.begin(TriggerStep::LeavingBranchActive {
                branch: update_branch.clone(),
            });
        }
    }

    flow.begin(TriggerStep::Completed {
        branch: update_branch.clone(),
    });

    Ok(TriggerSuccess {
        production_branch: production,
        update_branch,
        action,
        previous_status,
    })
}

fn verify_cli<C>(
    flow: &Flow<'_, C>,
    cli: &PlatformCli<'_>,
    env: &Environment,
) -> Result<(), TriggerError>
where
    C: TriggerCallbacks + ?Sized,
{
    let vendor = env.vendor;
    let token_var = vendor.token_vars().first().copied().unwrap_or_default();

    let checking_token = flow.begin(TriggerStep::CheckingToken { vendor });
    if !env.has_cli_token {
        return fail(
            &checking_token,
            format!(
                "You will need to create an environmental variable '{}' that contains a valid {} \
                 API token before I can run {} cli commands",
                token_var,
                vendor.display_name(),
                vendor.display_name()
            ),
        );
    }
    flow.done(&checking_token);

    let checking_cli = flow.begin(TriggerStep::CheckingCli { vendor });
    if !cli.is_installed() {
        return fail(
            &checking_cli,
            format!(
                "The {} CLI tool is not installed. Please add its installation to the build \
                 section of your {}",
                vendor.display_name(),
                APP_FILE
            ),
        );
    }
    flow.done(&checking_cli);

    let checking_validity = flow.begin(TriggerStep::CheckingTokenValidity { vendor });
    if !at_step(&checking_validity, cli.token_is_valid())? {
        return fail(
            &checking_validity,
            format!(
                "It appears that the '{}' is not valid, or is incorrect. I will need a valid API \
                 token before I can run {} cli commands",
                token_var,
                vendor.display_name()
            ),
        );
    }
    flow.done(&checking_validity);
    Ok(())
}

/// Keeps a git integration from deleting the environment we are about to create.
fn guard_prune_branches<C>(
    flow: &Flow<'_, C>,
    cli: &PlatformCli<'_>,
    branch: &str,
) -> Result<(), TriggerError>
where
    C: TriggerCallbacks + ?Sized,
{
    let checking = flow.begin(TriggerStep::CheckingIntegration);
    let Some(integration) = at_step(&checking, cli.git_integration_id())? else {
        return Ok(());
    };

    let prune_enabled = match cli.prune_branches_enabled(&integration) {
        Ok(enabled) => enabled,
        Err(e) => {
            flow.callbacks.on_warning(&format!(
                "{:#}. It appears this project has a git integration, but I was unable to \
                 retrieve its details, so I'm not sure if 'prune_branches' is enabled. If the \
                 update branch '{}' is missing, then your git integration probably deleted it",
                e, branch
            ));
            false
        }
    };
    if !prune_enabled {
        return Ok(());
    }

    flow.callbacks.on_warning(&format!(
        "'prune_branches' enabled in git integration! If I create the update branch '{}' while \
         'prune_branches' is enabled, the integration will immediately attempt to delete it.",
        branch
    ));

    let disabling = flow.begin(TriggerStep::DisablingPruneBranches {
        integration: integration.clone(),
    });
    let manual_steps = format!(
        "Your {} branch *will* be deleted by the git integration if I continue. You'll need to \
         manually create the {} branch first before running this update process.",
        branch, branch
    );
    if !flow
        .callbacks
        .confirm(&format!("Disable 'prune_branches' on integration {}?", integration))
    {
        return fail(
            &disabling,
            format!("'prune_branches' was left enabled. {}", manual_steps),
        );
    }
    at_step(
        &disabling,
        cli.disable_prune_branches(&integration).with_context(|| {
            format!(
                "I was unable to disable the 'prune_branches' setting for git integration {}. {}",
                integration, manual_steps
            )
        }),
    )?;
    flow.done(&disabling);
    flow.callbacks.on_warning(&format!(
        "You will need to re-enable 'prune_branches' in your integration after you manually \
         push the branch '{}' to your remote git repository.",
        branch
    ));
    Ok(())
}

fn validate_parent<C>(
    flow: &Flow<'_, C>,
    cli: &PlatformCli<'_>,
    branch: &str,
    production: &str,
) -> Result<(), TriggerError>
where
    C: TriggerCallbacks + ?Sized,
{
    let validating = flow.begin(TriggerStep::ValidatingParent {
        branch: branch.to_string(),
        parent: production.to_string(),
    });
    let parent = at_step(&validating, cli.parent_of(branch))?;
    if parent != production {
        return fail(
            &validating,
            format!(
                "The targeted update branch '{}', is not a direct descendant of the production \
                 branch '{}'. The update branch's parent is '{}'. This automated source \
                 operation only supports updating branches that are direct descendants of the \
                 production branch",
                branch, production, parent
            ),
        );
    }
    Ok(())
}
