mod balance;
mod diff;
mod show;
mod snapshot;

use anyhow::Result;
use balance::Balance;
use clap::{Parser, Subcommand};
use diff::Diff;
use show::Show;

#[derive(Debug, Parser)]
#[command(name = "danube-workload-cli")]
#[command(about = "CLI to run and inspect workload balancing passes of the Danube consumer nodes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one balancing pass over a stored assignment view
    #[command(display_order = 1)]
    Balance(Balance),

    /// Show the per node load of a stored assignment view
    #[command(display_order = 2)]
    Show(Show),

    /// Show the assignments to stop and start between two stored views
    #[command(display_order = 3)]
    Diff(Diff),
}

fn main() -> Result<()> {
    // Logs go to stderr, stdout carries the command output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Balance(args) => balance::handle(args),
        Commands::Show(args) => show::handle(args),
        Commands::Diff(args) => diff::handle(args),
    }
}
