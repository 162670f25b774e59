//! Test infrastructure for sop-autoupdate integration tests.
#![allow(dead_code)]

use anyhow::Result;
use sop_autoupdate::command::{Cmd, CommandOutput, CommandRunner, SystemRunner};
use sop_autoupdate::config::{Environment, Vendor};
use sop_autoupdate::git::run_git;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary git repository for testing.
/// Automatically cleaned up when dropped.
pub struct TestRepo {
    _temp_dir: TempDir,
    path: PathBuf,
}

impl TestRepo {
    /// Creates a new test repository with an initial commit on the master branch.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().to_path_buf();
        let runner = SystemRunner::default();

        run_git(&runner, &path, &["init", "-b", "master"])?;
        run_git(&runner, &path, &["config", "user.email", "test@example.com"])?;
        run_git(&runner, &path, &["config", "user.name", "Test User"])?;
        run_git(&runner, &path, &["config", "commit.gpgsign", "false"])?;

        std::fs::write(path.join("README.md"), "# Test Repo\n")?;
        run_git(&runner, &path, &["add", "README.md"])?;
        run_git(&runner, &path, &["commit", "-m", "Initial commit"])?;

        Ok(Self {
            _temp_dir: temp_dir,
            path,
        })
    }

    /// Writes `contents` to a path relative to the repository root, creating parents.
    pub fn write(&self, relative: &str, contents: &str) -> Result<()> {
        let file = self.path.join(relative);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(file, contents)?;
        Ok(())
    }

    /// Writes the given files and commits them.
    pub fn commit_files(&self, files: &[(&str, &str)]) -> Result<()> {
        let runner = SystemRunner::default();
        for (relative, contents) in files {
            self.write(relative, contents)?;
            run_git(&runner, &self.path, &["add", relative])?;
        }
        run_git(&runner, &self.path, &["commit", "-m", "Add files"])?;
        Ok(())
    }

    pub fn last_commit_message(&self) -> Result<String> {
        run_git(&SystemRunner::default(), &self.path, &["log", "-1", "--format=%B"])
    }

    pub fn commit_count(&self) -> Result<usize> {
        let count = run_git(
            &SystemRunner::default(),
            &self.path,
            &["rev-list", "--count", "HEAD"],
        )?;
        Ok(count.parse()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Runner that answers from a script and records every command it is asked to run.
///
/// Commands are matched on their rendered form. A queued answer is consumed once
/// unless it is the last one for that command; unscripted commands succeed with
/// empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: RefCell<HashMap<String, VecDeque<CommandOutput>>>,
    installed: HashSet<String>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn installed(mut self, program: &str) -> Self {
        self.installed.insert(program.to_string());
        self
    }

    pub fn respond(self, command: &str, output: CommandOutput) -> Self {
        self.responses
            .borrow_mut()
            .entry(command.to_string())
            .or_default()
            .push_back(output);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, cmd: &Cmd, _cwd: Option<&Path>) -> Result<CommandOutput> {
        let rendered = cmd.to_string();
        self.calls.borrow_mut().push(rendered.clone());

        let mut responses = self.responses.borrow_mut();
        let output = match responses.get_mut(&rendered) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(output.unwrap_or_else(|| CommandOutput::ok("")))
    }

    fn is_installed(&self, program: &str) -> bool {
        self.installed.contains(program)
    }
}

/// Runs git for real and fakes package managers by rewriting their lock file.
pub struct FakeUpdaterRunner {
    git: SystemRunner,
    /// Lock file each fake updater writes, keyed by program name.
    locks: HashMap<&'static str, &'static str>,
    /// Programs that should fail instead of touching anything.
    failing: HashSet<&'static str>,
    pub updater_calls: RefCell<Vec<(String, PathBuf)>>,
}

impl FakeUpdaterRunner {
    pub fn new() -> Self {
        let locks = HashMap::from([
            ("composer", "composer.lock"),
            ("pipenv", "Pipfile.lock"),
            ("bundle", "Gemfile.lock"),
            ("go", "go.sum"),
            ("npm", "package-lock.json"),
            ("yarn", "yarn.lock"),
        ]);
        Self {
            git: SystemRunner::default(),
            locks,
            failing: HashSet::new(),
            updater_calls: RefCell::new(Vec::new()),
        }
    }

    /// Makes `program` leave its lock file untouched.
    pub fn unchanged(mut self, program: &'static str) -> Self {
        self.locks.remove(program);
        self
    }

    pub fn failing(mut self, program: &'static str) -> Self {
        self.failing.insert(program);
        self
    }
}

impl CommandRunner for FakeUpdaterRunner {
    fn run(&self, cmd: &Cmd, cwd: Option<&Path>) -> Result<CommandOutput> {
        if cmd.program() == "git" {
            return self.git.run(cmd, cwd);
        }

        let dir = cwd.map(Path::to_path_buf).unwrap_or_default();
        self.updater_calls
            .borrow_mut()
            .push((cmd.to_string(), dir.clone()));

        if self.failing.contains(cmd.program()) {
            return Ok(CommandOutput::failed(format!(
                "{}: dependency resolution failed\n",
                cmd.program()
            )));
        }
        if let Some(lock) = self.locks.get(cmd.program()) {
            std::fs::write(dir.join(lock), format!("updated by {}\n", cmd))?;
        }
        Ok(CommandOutput::ok(""))
    }

    fn is_installed(&self, program: &str) -> bool {
        self.git.is_installed(program)
    }
}

/// Environment as the cron job sees it, with a token and default names.
pub fn test_environment() -> Environment {
    Environment {
        source_dir: None,
        has_cli_token: true,
        update_branch: "update".to_string(),
        source_operation: "auto-update".to_string(),
        vendor: Vendor::Platform,
    }
}
