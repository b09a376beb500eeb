// Hill-Burton panel CLI - builds the state-year allocation panel from
// income, population and project-register sources.

mod diagnostics;
mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_CONFIG, EXIT_IO, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "hbpanel")]
#[command(about = "Hill-Burton allocation panel: predicted vs. actual federal hospital funding")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the panel and write the CSV, scatter plot and validation report
    #[command(after_help = "\
Examples:
  hbpanel run --config panel.toml
  hbpanel run --config panel.toml --out-dir build --json > summary.json
  RUST_LOG=debug hbpanel run --config panel.toml

Input paths in the config are relative to the config file's directory.
Without --config the defaults apply and inputs are read from the current directory.

Exit codes:
  0   Panel built, artifacts written
  3   Cannot read an input or write an artifact
  4   Invalid config
  5   Malformed delimited input
  10  Column resolution failed
  11  Merge integrity failed (unmatched keys)
  12  Balance violation (row counts, duplicates, incomplete rows)")]
    Run {
        /// Panel config (TOML)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Write artifacts here instead of the config's [output] dir
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Print a JSON summary to stdout
        #[arg(long)]
        json: bool,
    },

    /// Check a config file without reading any inputs
    Validate {
        /// Panel config (TOML); defaults are checked when omitted
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Diagnostics go to stderr so stdout stays clean for --json
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Run { config, out_dir, json } => run::cmd_run(config, out_dir, json),
        Commands::Validate { config } => run::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
