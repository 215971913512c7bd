//! navtree CLI - navigation tree resolution engine.
//!
//! Provides commands for:
//! - `resolve`: Locate a page in the navigation tree
//! - `check`: Resolve the smoke-test anchors of the navigation index
//! - `tree`: Print the navigation tree
//! - `sync`: Show or toggle panel synchronisation

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CheckArgs, GlobalArgs, ResolveArgs, SyncArgs, TreeArgs};
use output::Output;

/// navtree - navigation tree resolution engine.
#[derive(Parser)]
#[command(name = "navtree", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate a page in the navigation tree.
    Resolve(ResolveArgs),
    /// Resolve the first and last entries of the navigation index.
    Check(CheckArgs),
    /// Print the navigation tree.
    Tree(TreeArgs),
    /// Show or toggle panel synchronisation.
    Sync(SyncArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.global.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create tokio runtime");

    let result = rt.block_on(async {
        match cli.command {
            Commands::Resolve(args) => args.execute(&cli.global).await,
            Commands::Check(args) => args.execute(&cli.global).await,
            Commands::Tree(args) => args.execute(&cli.global).await,
            Commands::Sync(args) => args.execute(&cli.global),
        }
    });

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
