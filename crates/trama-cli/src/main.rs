//! Trama CLI tool
//!
//! Translates JSON-serialized compilation units and prints capture,
//! eligibility and function records, the rewritten tree, or statistics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use trama_cli::commands::analyze::{self, AnalyzeArgs, Emit};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "trama")]
#[command(about = "Nested-type capture resolution and method functionization", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a unit and print the result as JSON
    Analyze {
        /// JSON-serialized compilation unit
        unit: PathBuf,
        /// Translator config (defaults to trama.toml beside the unit)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Also functionize non-private final and static methods
        #[arg(long)]
        functionize_final_methods: bool,
        /// What to print
        #[arg(long, value_enum, default_value_t = Emit::Records)]
        emit: Emit,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("TRAMA_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze {
            unit,
            config,
            functionize_final_methods,
            emit,
        } => analyze::execute(AnalyzeArgs {
            unit,
            config,
            functionize_final_methods,
            emit,
        }),
    }
}
