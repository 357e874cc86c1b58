mod adapter;
mod cli;
mod commands;
mod config;
mod control;
mod model;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::model::GapStatus;

fn main() {
    init_tracing();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            error!(error = %err, "command failed");
            for cause in err.chain().skip(1) {
                error!(cause = %cause, "caused by");
            }
            std::process::exit(1);
        }
    }
}

/// Dispatches the subcommand and returns the process exit code.
fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Segment(args) => commands::segment::run(args).map(|()| 0),
        Commands::Batch(args) => commands::batch::run(args).map(|()| 0),
        Commands::Process(args) => commands::process::run(args).map(|()| 0),
        Commands::Verify(args) => commands::verify::run(args).map(|()| 0),
        Commands::Merge(args) => commands::merge::run(args).map(|()| 0),
        Commands::Audit(args) => commands::audit::run(args).map(GapStatus::exit_code),
        Commands::Run(args) => {
            commands::pipeline::run(args).map(|status| status.map_or(0, GapStatus::exit_code))
        }
        Commands::Cancel(args) => commands::cancel::run(args).map(|()| 0),
        Commands::Status(args) => commands::status::run(args).map(|()| 0),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
