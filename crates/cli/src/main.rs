// migrecon CLI - config-driven pre/post migration reconciliation

mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "migrecon")]
#[command(about = "Reconcile pre/post migration player balance snapshots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reconciliation from a TOML config file
    #[command(after_help = "\
Examples:
  migrecon run july.toml
  migrecon run july.toml --json
  migrecon run july.toml --output exceptions.csv")]
    Run {
        /// Path to the run config file
        config: PathBuf,

        /// Output the full result as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write the exception report CSV here (overrides config)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Validate a run config without executing it
    #[command(after_help = "\
Examples:
  migrecon validate july.toml")]
    Validate {
        /// Path to the run config file
        config: PathBuf,
    },
}

/// Error carrying its exit code; message goes to stderr.
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, json, output } => run::cmd_run(config, json, output),
        Commands::Validate { config } => run::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(err.code)
        }
    }
}
