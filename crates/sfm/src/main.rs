//! SFM CLI - Stoplight to Fern migrator.
//!
//! Provides commands for:
//! - `migrate`: Convert a Stoplight export or hosted site into Fern pages and
//!   `docs.yml` navigation

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::MigrateArgs;
use output::Output;

/// SFM - Stoplight to Fern migrator.
#[derive(Parser)]
#[command(name = "sfm", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate Stoplight docs into a Fern docs project.
    Migrate(MigrateArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = matches!(&cli.command, Commands::Migrate(args) if args.verbose);

    // --verbose enables INFO level, otherwise use RUST_LOG
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Migrate(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
