use clap::{Parser, Subcommand};
use sop_autoupdate::command::SystemRunner;
use sop_autoupdate::config::{Config, Environment, Verbosity};
use sop_autoupdate::output::{self, TriggerConsole, UpdateConsole};
use sop_autoupdate::{autoupdate, trigger};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sop-autoupdate")]
#[command(about = "Automated dependency updates for source operations", long_about = None)]
#[command(version)]
struct Cli {
    /// Print every command as it is executed
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print warnings and failures
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Update dependencies in the source tree and commit changed lock files
    Update,
    /// Prepare the update environment and run the auto-update source operation on it
    Trigger {
        /// Do not ask before changing git integration settings
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };
    let assume_yes = matches!(cli.command, Commands::Trigger { yes: true });
    let config = Config {
        verbosity,
        assume_yes,
    };

    let env = Environment::from_env();
    let runner = SystemRunner::new(config.command_logger());

    let success = match cli.command {
        Commands::Update => {
            // Source operation containers check the app out away from the working directory.
            let source_dir = match &env.source_dir {
                Some(dir) => dir.clone(),
                None => std::env::current_dir()?,
            };
            if config.is_verbose() {
                output::print_working_dir(&source_dir, &config);
            }
            autoupdate::update(&runner, &source_dir, &UpdateConsole::new(config)).is_success()
        }
        Commands::Trigger { .. } => {
            trigger::trigger(&runner, &env, &TriggerConsole::new(config)).is_success()
        }
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
