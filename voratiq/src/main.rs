//! Voratiq command-line entry point.
//!
//! Runs every configured coding agent against one spec, each in its own git
//! worktree, and records the outcome in `.voratiq/runs.jsonl`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use voratiq::cli::{RunArgs, cmd_init, cmd_list, cmd_run, cmd_show};
use voratiq::exit_codes;
use voratiq::io::process::ambient_env;
use voratiq::logging;
use voratiq::render::render_run_summary;

#[derive(Parser)]
#[command(
    name = "voratiq",
    version,
    about = "Run coding agents side by side against one spec"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.voratiq/` (runs directory, run log, config) if missing.
    Init,
    /// Run every configured agent against a spec.
    Run {
        /// Spec file, relative to the repository root.
        #[arg(long)]
        spec: Option<String>,
        /// Verification command run in each agent's workspace.
        #[arg(long)]
        test_command: Option<String>,
        /// Explicit run id instead of a generated one.
        #[arg(long = "id")]
        run_id: Option<String>,
    },
    /// List recorded runs, oldest first.
    List,
    /// Print the stored record of one run as JSON.
    Show { run_id: String },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = std::env::current_dir().context("resolve current directory")?;
    match cli.command {
        Command::Init => {
            println!("{}", cmd_init(&root)?);
            Ok(exit_codes::OK)
        }
        Command::Run {
            spec,
            test_command,
            run_id,
        } => {
            let args = RunArgs {
                spec,
                test_command,
                run_id,
            };
            let report = cmd_run(&root, &args, ambient_env())?;
            println!("{}", render_run_summary(&report));
            if report.had_agent_failure || report.had_test_failure {
                Ok(exit_codes::RUN_FAILED)
            } else {
                Ok(exit_codes::OK)
            }
        }
        Command::List => {
            println!("{}", cmd_list(&root)?);
            Ok(exit_codes::OK)
        }
        Command::Show { run_id } => {
            println!("{}", cmd_show(&root, &run_id)?);
            Ok(exit_codes::OK)
        }
    }
}
