mod cli;
mod config;
mod dataset;
mod guidelines;
mod migrate;
mod policy;
mod recorder;
mod review;
mod selector;
mod session;
mod store;
mod sync;
mod util;
mod view;
mod workflow;

use anyhow::Result;
use clap::Parser;
use cli::{Command, RootArgs};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);
    match args.command {
        Command::Next(args) => workflow::run_next(args),
        Command::Pending(args) => workflow::run_pending(args),
        Command::Label(args) => workflow::run_label(args),
        Command::Vote(args) => workflow::run_vote(args),
        Command::Status(args) => workflow::run_status(args),
        Command::Guidelines(args) => workflow::run_guidelines(args),
        Command::Review(args) => workflow::run_review_command(args),
        Command::Migrate(args) => workflow::run_migrate(args),
    }
}
