//! CLI command implementations.
//!
//! Boot order for `serve`: knowledge base → action manager → broadcast
//! server → HTTP server. A rule-load failure at this point is fatal; the
//! same failure at a later reload is not.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::actions::ActionManager;
use crate::broadcast::BroadcastServer;
use crate::config::Config;
use crate::http_server::HttpServer;
use crate::rules::{self, RuleEngine};

use super::args::{Cli, Command};
use super::errors::CliResult;

pub fn run_command(cli: Cli) -> CliResult<()> {
    match cli.command {
        Command::Serve { config } => serve(&config),
        Command::CheckRules { config } => check_rules(&config),
    }
}

/// One-shot load validation of the configured rule sources.
fn check_rules(config_path: &Path) -> CliResult<()> {
    let config = Config::load_or_default(config_path)?;
    let kb = rules::load_knowledge(
        &config.rules.sources(),
        &config.rules.knowledge_base,
        1,
    )?;

    println!(
        "{}: {} rules compile cleanly",
        kb.name(),
        kb.rule_count()
    );
    for name in kb.rule_names() {
        println!("  {}", name);
    }
    Ok(())
}

fn serve(config_path: &Path) -> CliResult<()> {
    let config = Config::load_or_default(config_path)?;

    let engine = Arc::new(RuleEngine::new(
        &config.rules.knowledge_base,
        config.rules.sources(),
        config.rules.max_cycles,
    )?);
    let manager = Arc::new(ActionManager::new(config.actions.history_limit));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let broadcast =
            BroadcastServer::start(config.broadcast.clone(), Arc::clone(&manager)).await?;

        let http = HttpServer::new(
            config.http.clone(),
            Arc::clone(&engine),
            Arc::clone(&manager),
        );

        tokio::select! {
            result = http.start() => result?,
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
            }
        }

        broadcast.close();
        Ok(())
    })
}
