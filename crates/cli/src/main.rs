//! icspec CLI: the main entry point.
//!
//! Commands:
//! - `validate`: Check an ICS document against the layer rules
//! - `analyze`:  Count layer tokens and simulate session cost
//! - `layout`:   Show the naive and lifetime-aware prompt layouts
//! - `config`:   Show, locate or initialise the config file
//!
//! Exit codes: 0 compliant / success, 1 non-compliant or malformed
//! document, 2 usage or input error.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use icspec_telemetry::CountingMethod;

mod commands;

#[derive(Parser)]
#[command(
    name = "icspec",
    about = "icspec: Instruction Contract Specification validator and cost analyzer",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an ICS document
    Validate {
        /// Document to validate
        #[arg(required_unless_present = "stdin", conflicts_with = "stdin")]
        file: Option<PathBuf>,

        /// Read the document from standard input
        #[arg(long)]
        stdin: bool,

        /// Emit the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count tokens per layer and simulate a session
    Analyze {
        /// Document to analyze
        file: PathBuf,

        /// Invocations in the simulated session
        #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
        invocations: Option<u64>,

        /// Times SESSION_STATE is resent during the session
        #[arg(long)]
        session_changes: Option<u64>,

        /// Token counting method (approx, word, exact)
        #[arg(short, long)]
        method: Option<CountingMethod>,

        /// tokenizer.json for the exact method
        #[arg(long)]
        tokenizer: Option<PathBuf>,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how the document would be sent, naive and lifetime-aware
    Layout {
        /// Document to lay out
        file: PathBuf,

        /// Emit both layouts as JSON content blocks
        #[arg(long)]
        json: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for reports
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Validate { file, stdin, json } => commands::validate::run(file, stdin, json),
        Commands::Analyze {
            file,
            invocations,
            session_changes,
            method,
            tokenizer,
            json,
        } => commands::analyze::run(commands::analyze::AnalyzeArgs {
            file,
            invocations,
            session_changes,
            method,
            tokenizer,
            json,
        }),
        Commands::Layout { file, json } => commands::layout::run(file, json),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(),
            ConfigAction::Path => commands::config_cmd::path(),
            ConfigAction::Init { force } => commands::config_cmd::init(force),
        },
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            commands::EXIT_USAGE.into()
        }
    }
}
