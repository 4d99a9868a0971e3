// tabmatch CLI - match CDL rows to GITHUB rows and write the merged sheet

mod exit_codes;
mod logging;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};
use recon::RunArgs;

#[derive(Parser)]
#[command(name = "tabmatch")]
#[command(about = "Match CDL rows to GITHUB rows and merge them into one workbook")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Only log warnings and errors; skip the summary
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match the two sheets of a workbook and write the merged result
    #[command(after_help = "\
Examples:
  tabmatch run
  tabmatch run compare.xlsx merged.xlsx --preset b
  tabmatch run compare.xlsx --config vend_compare.toml --output-mode separate
  tabmatch run compare.xlsx --append --on-duplicate flag
  tabmatch run compare.xlsx --mode many-to-one --json")]
    Run(RunArgs),

    /// Check a config file without running
    #[command(after_help = "\
Examples:
  tabmatch validate vend_compare.toml")]
    Validate {
        /// Path to the TOML config file
        config: PathBuf,
    },

    /// List the built-in key presets
    Presets {
        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  tabmatch-recon ", env!("CARGO_PKG_VERSION"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet { "warn" } else { "info" };
    if let Err(err) = logging::init_logging(level) {
        eprintln!("error: {err}");
        return ExitCode::from(EXIT_USAGE);
    }

    let result = match cli.command {
        Commands::Run(args) => recon::cmd_run(args, cli.quiet),
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Presets { json } => recon::cmd_presets(json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            tracing::debug!(exit_code = code, "run failed");
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
