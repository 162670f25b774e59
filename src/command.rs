//! External command execution.
//!
//! Every program the updater talks to (package managers, git, the platform
//! CLI) goes through [`CommandRunner`], so the flows can be driven by
//! scripted outputs in tests.

use anyhow::Context;
use std::fmt;
use std::path::Path;

/// Logger callback invoked before a command is spawned.
pub type CommandLogger = fn(&Cmd, Option<&Path>);

/// Logger that echoes each command being executed.
pub fn verbose_logger(cmd: &Cmd, cwd: Option<&Path>) {
    match cwd {
        Some(dir) => eprintln!("    $ {} (in {})", cmd, dir.display()),
        None => eprintln!("    $ {}", cmd),
    }
}

/// Logger that discards command output.
pub fn no_op_logger(_cmd: &Cmd, _cwd: Option<&Path>) {}

/// A program invocation: program name plus arguments, never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Splits a whitespace-separated command line such as `bundle update --all`.
    /// Returns `None` for an empty line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).args(parts))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Outcome of a command that ran to completion.
///
/// `message` holds stdout when the command succeeded and stderr otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub message: String,
}

impl CommandOutput {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Message with surrounding whitespace removed, for comparisons.
    pub fn trimmed(&self) -> &str {
        self.message.trim()
    }

    /// Converts a failed run into an error carrying the captured stderr.
    pub fn into_result(self, cmd: &Cmd) -> anyhow::Result<String> {
        if self.success {
            Ok(self.message)
        } else {
            anyhow::bail!("{} failed: {}", cmd, self.message.trim_end())
        }
    }
}

/// Seam between the flows and the operating system.
pub trait CommandRunner {
    /// Runs `cmd` to completion. Errors only when the process could not be spawned;
    /// a non-zero exit is reported through [`CommandOutput::success`].
    fn run(&self, cmd: &Cmd, cwd: Option<&Path>) -> anyhow::Result<CommandOutput>;

    /// Whether `program` can be resolved on `PATH`.
    fn is_installed(&self, program: &str) -> bool;

    /// Runs `cmd` and fails on a non-zero exit, returning stdout.
    fn run_checked(&self, cmd: &Cmd, cwd: Option<&Path>) -> anyhow::Result<String> {
        self.run(cmd, cwd)?.into_result(cmd)
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy)]
pub struct SystemRunner {
    logger: CommandLogger,
}

impl SystemRunner {
    pub fn new(logger: CommandLogger) -> Self {
        Self { logger }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(no_op_logger)
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &Cmd, cwd: Option<&Path>) -> anyhow::Result<CommandOutput> {
        (self.logger)(cmd, cwd);

        let mut command = std::process::Command::new(&cmd.program);
        command.args(&cmd.args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .with_context(|| format!("Failed to spawn command '{}'", cmd))?;

        if output.status.success() {
            Ok(CommandOutput::ok(String::from_utf8_lossy(&output.stdout)))
        } else {
            Ok(CommandOutput::failed(String::from_utf8_lossy(&output.stderr)))
        }
    }

    fn is_installed(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Rejects identifiers that would be misread as flags or break line-based output.
pub fn validate_name(kind: &str, name: &str) -> anyhow::Result<()> {
    if name.is_empty() || name.starts_with('-') || name.contains(['\0', '\n', '\r']) {
        anyhow::bail!("Invalid {} name: {:?}", kind, name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_arguments_with_whitespace() {
        let cmd = Cmd::new("git").args(["commit", "-m", "two words"]);
        assert_eq!(cmd.to_string(), "git commit -m \"two words\"");

        let cmd = Cmd::new("git").args(["commit", "-m", "line\nbreak"]);
        assert_eq!(cmd.to_string(), "git commit -m \"line\\nbreak\"");
    }

    #[test]
    fn test_parse_splits_command_line() {
        let cmd = Cmd::parse("bundle update --all").unwrap();
        assert_eq!(cmd.program(), "bundle");
        assert_eq!(cmd.get_args(), ["update", "--all"]);
        assert!(Cmd::parse("   ").is_none());
    }

    #[test]
    fn test_into_result_surfaces_stderr() {
        let cmd = Cmd::new("npm").arg("update");
        let err = CommandOutput::failed("boom\n").into_result(&cmd).unwrap_err();
        assert_eq!(err.to_string(), "npm update failed: boom");

        let out = CommandOutput::ok("fine").into_result(&cmd).unwrap();
        assert_eq!(out, "fine");
    }

    #[test]
    fn test_validate_name_rejects_flags_and_control_characters() {
        assert!(validate_name("branch", "update").is_ok());
        assert!(validate_name("branch", "feature/deps").is_ok());
        assert!(validate_name("branch", "").is_err());
        assert!(validate_name("branch", "--force").is_err());
        assert!(validate_name("branch", "a\nb").is_err());
        assert!(validate_name("branch", "a\0b").is_err());
    }

    #[test]
    fn test_system_runner_reports_spawn_failure() {
        let runner = SystemRunner::default();
        let result = runner.run(&Cmd::new("definitely-not-a-real-program-xyz"), None);
        let message = result.unwrap_err().to_string();
        assert!(message.contains("Failed to spawn command"));
        assert!(!runner.is_installed("definitely-not-a-real-program-xyz"));
    }

    #[test]
    fn test_logger_selection_is_plain_fn_pointer() {
        let runner = SystemRunner::new(verbose_logger);
        assert!(std::ptr::fn_addr_eq(
            runner.logger as CommandLogger,
            verbose_logger as CommandLogger
        ));
    }
}
