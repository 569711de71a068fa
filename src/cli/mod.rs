//! CLI module for skywarden
//!
//! Commands:
//! - serve: boot the decision layer and serve until interrupted
//! - check-rules: one-shot load validation of the configured rule
//!   sources

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::run_command;
pub use errors::{CliError, CliResult};

/// Parse arguments, initialize logging, dispatch.
pub fn run() -> CliResult<()> {
    init_tracing();
    run_command(Cli::parse_args())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // try_init: tolerate a subscriber installed by an embedding test
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
