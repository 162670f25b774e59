//! Console output: colored log lines, spinners and failure reports.
//!
//! Info lines go to stdout so they land in the source operation log; warnings
//! and failures go to stderr.

use crate::autoupdate::{UpdateCallbacks, UpdateOutcome, UpdateResult, UpdateStep};
use crate::config::Config;
use crate::constants::PROGRESS_TICK_MS;
use crate::trigger::{TriggerCallbacks, TriggerOutcome, TriggerResult, TriggerStep};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

/// No-op callbacks for when progress tracking is not needed.
/// Accepts every confirmation prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOpCallbacks;

impl UpdateCallbacks for NoOpCallbacks {
    fn on_step(&self, _step: &UpdateStep) {}
}

impl TriggerCallbacks for NoOpCallbacks {
    fn on_step(&self, _step: &TriggerStep) {}
    fn on_warning(&self, _message: &str) {}
}

pub fn print_info(config: &Config, message: &str) {
    if config.is_quiet() {
        return;
    }
    println!("{}", message);
}

pub fn print_success(config: &Config, message: &str) {
    if config.is_quiet() {
        return;
    }
    println!("{}", message.cyan().bold());
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "WARNING".red().bold(), message);
}

/// Reports a failed action together with the output that explains it.
pub fn print_command_failed(event: &str, output: &str) {
    eprintln!(
        "{} {}",
        "WARNING".red().bold(),
        format!("{} {}", event.cyan().bold(), "command failed!".red())
    );
    eprintln!("See the following output:");
    eprintln!("{}", output.trim_end());
}

pub fn print_working_dir(path: &Path, config: &Config) {
    if config.is_quiet() {
        return;
    }
    println!(
        "{} {}",
        "Working in:".cyan(),
        path.display().to_string().white().bold()
    )
}

fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f32())
}

/// Spinner shown while a long-running command blocks.
/// Hidden in quiet or verbose mode, and by indicatif when stderr is not a terminal.
struct Spinner {
    bar: RefCell<Option<ProgressBar>>,
    enabled: bool,
}

impl Spinner {
    fn new(config: &Config) -> Self {
        Self {
            bar: RefCell::new(None),
            enabled: !config.is_quiet() && !config.is_verbose(),
        }
    }

    fn start(&self, message: String) {
        self.clear();
        if !self.enabled {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message);
        spinner.enable_steady_tick(Duration::from_millis(PROGRESS_TICK_MS));
        *self.bar.borrow_mut() = Some(spinner);
    }

    fn clear(&self) {
        if let Some(bar) = self.bar.borrow_mut().take() {
            bar.finish_and_clear();
        }
    }
}

/// Console output for the dependency update flow.
pub struct UpdateConsole {
    config: Config,
    spinner: Spinner,
}

impl UpdateConsole {
    pub fn new(config: Config) -> Self {
        Self {
            spinner: Spinner::new(&config),
            config,
        }
    }
}

impl UpdateCallbacks for UpdateConsole {
    fn on_step(&self, step: &UpdateStep) {
        self.spinner.clear();
        match step {
            UpdateStep::Completed => print_success(&self.config, &step.to_string()),
            UpdateStep::RunningUpdater { command } => {
                print_info(&self.config, &step.to_string());
                self.spinner.start(format!("Waiting for {}...", command));
            }
            UpdateStep::Discovering | UpdateStep::Committing => {
                if self.config.is_verbose() {
                    eprintln!("  {}", step.to_string().dimmed());
                }
            }
            _ => print_info(&self.config, &step.to_string()),
        }
    }

    fn on_complete(&self, result: &UpdateResult) {
        self.spinner.clear();
        match &result.outcome {
            UpdateOutcome::Success(success) => {
                if self.config.is_verbose() {
                    eprintln!(
                        "  {} {} manifest(s), {} lock file(s) committed in {}",
                        "✓".green(),
                        success.manifests.len(),
                        success.committed_locks.len(),
                        format_duration(result.duration).dimmed()
                    );
                }
            }
            UpdateOutcome::Failed(failure) => {
                print_command_failed(&failure.step.event(), &failure.error);
            }
        }
    }
}

/// Console output for the branch orchestration flow.
pub struct TriggerConsole {
    config: Config,
    spinner: Spinner,
}

impl TriggerConsole {
    pub fn new(config: Config) -> Self {
        Self {
            spinner: Spinner::new(&config),
            config,
        }
    }

    fn is_interactive(&self) -> bool {
        !self.config.assume_yes && std::io::stdin().is_terminal()
    }
}

impl TriggerCallbacks for TriggerConsole {
    fn on_step(&self, step: &TriggerStep) {
        self.spinner.clear();
        match step {
            TriggerStep::Completed { .. } => print_success(&self.config, &step.to_string()),
            TriggerStep::SyncingBranch { .. }
            | TriggerStep::CreatingBranch { .. }
            | TriggerStep::ActivatingBranch { .. }
            | TriggerStep::RunningSourceOperation { .. } => {
                print_info(&self.config, &step.to_string());
                self.spinner
                    .start("Waiting for the platform to finish...".to_string());
            }
            _ => print_info(&self.config, &step.to_string()),
        }
    }

    fn on_done(&self, message: &str) {
        self.spinner.clear();
        print_success(&self.config, message);
    }

    fn on_warning(&self, message: &str) {
        self.spinner.clear();
        print_warning(message);
    }

    fn confirm(&self, prompt: &str) -> bool {
        if !self.is_interactive() {
            return true;
        }
        self.spinner.clear();
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()
            .unwrap_or(false)
    }

    fn on_complete(&self, result: &TriggerResult) {
        self.spinner.clear();
        match &result.outcome {
            TriggerOutcome::Success(_) => {
                if self.config.is_verbose() {
                    eprintln!(
                        "  {} finished in {}",
                        "✓".green(),
                        format_duration(result.duration).dimmed()
                    );
                }
            }
            TriggerOutcome::Failed(failure) => {
                print_command_failed(&failure.step.event(), &failure.error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autoupdate::{UpdateFailure, UpdateSuccess};
    use crate::config::Verbosity;
    use std::path::PathBuf;

    fn quiet() -> Config {
        Config {
            verbosity: Verbosity::Quiet,
            ..Config::default()
        }
    }

    #[test]
    fn test_format_duration_rounds_to_two_decimals() {
        assert_eq!(format_duration(Duration::from_millis(1234)), "1.23s");
        assert_eq!(format_duration(Duration::from_millis(5678)), "5.68s");
        assert_eq!(format_duration(Duration::from_secs(42)), "42.00s");
    }

    #[test]
    fn test_spinner_disabled_in_quiet_and_verbose_modes() {
        assert!(!Spinner::new(&quiet()).enabled);
        let verbose = Config {
            verbosity: Verbosity::Verbose,
            ..Config::default()
        };
        assert!(!Spinner::new(&verbose).enabled);
        assert!(Spinner::new(&Config::default()).enabled);
    }

    #[test]
    fn test_no_op_callbacks_accept_prompts() {
        let callbacks = NoOpCallbacks;
        UpdateCallbacks::on_step(&callbacks, &UpdateStep::Started);
        TriggerCallbacks::on_step(&callbacks, &TriggerStep::Started);
        callbacks.on_warning("ignored");
        assert!(callbacks.confirm("Disable?"));
    }

    #[test]
    fn test_assume_yes_skips_prompt() {
        let console = TriggerConsole::new(Config {
            assume_yes: true,
            ..quiet()
        });
        assert!(!console.is_interactive());
        assert!(console.confirm("Disable 'prune_branches'?"));
    }

    #[test]
    fn test_update_console_handles_both_outcomes() {
        // Smoke test: output goes to the terminal, this only checks nothing panics.
        let console = UpdateConsole::new(quiet());
        let success = UpdateResult {
            path: PathBuf::from("/mnt/source"),
            outcome: UpdateOutcome::Success(UpdateSuccess {
                manifests: vec![PathBuf::from("composer.json")],
                committed_locks: vec![PathBuf::from("composer.lock")],
            }),
            duration: Duration::from_secs(2),
        };
        let failure = UpdateResult {
            path: PathBuf::from("/mnt/source"),
            outcome: UpdateOutcome::Failed(UpdateFailure {
                error: "composer: command not found".to_string(),
                step: UpdateStep::RunningUpdater {
                    command: "composer update".to_string(),
                },
            }),
            duration: Duration::from_millis(500),
        };

        console.on_step(&UpdateStep::RunningUpdater {
            command: "composer update".to_string(),
        });
        console.on_complete(&success);
        console.on_complete(&failure);
    }
}
