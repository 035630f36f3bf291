//! figura CLI - static diagram generation.
//!
//! Provides commands for:
//! - `build`: Render every diagram once and prune stale assets
//! - `watch`: Regenerate diagrams as documents and sources change

mod commands;
mod error;
mod output;
mod pipeline;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, WatchArgs};
use output::Output;

/// figura - theme-aware static diagrams for documentation sites.
#[derive(Parser)]
#[command(name = "figura", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render all diagrams and prune stale assets.
    Build(BuildArgs),
    /// Watch documents and diagram sources, regenerating on change.
    Watch(WatchArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = match &cli.command {
        Commands::Build(args) => args.verbose,
        Commands::Watch(args) => args.verbose,
    };

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
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
        Commands::Build(args) => args.execute(),
        Commands::Watch(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        if let Some(hint) = err.remediation() {
            output.warning(hint);
        }
        std::process::exit(1);
    }
}
