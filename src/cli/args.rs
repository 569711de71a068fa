//! CLI argument definitions using clap
//!
//! Commands:
//! - skywarden serve --config <path>
//! - skywarden check-rules --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// skywarden - A real-time battlefield decision engine with
/// hot-reloadable rules
#[derive(Parser, Debug)]
#[command(name = "skywarden")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the decision layer (fact ingestion + action broadcast)
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./skywarden.json")]
        config: PathBuf,
    },

    /// Load and validate the configured rule sources, then exit
    CheckRules {
        /// Path to configuration file
        #[arg(long, default_value = "./skywarden.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
