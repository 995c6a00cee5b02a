use clap::Parser;
use rebalancer::cli::{self, Cli, Commands};
use rebalancer::config::AppConfig;
use rebalancer::error::Result;
use rebalancer::logging::{init_logging, init_logging_simple};
use rebalancer::optimizer::Optimizer;
use rebalancer::orchestrator::Orchestrator;
use rebalancer::vault::PaperVault;
use std::sync::Arc;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config_dir)?;

    match &cli.command {
        Commands::Rebalance { .. } | Commands::Batch { .. } => init_logging(&config.logging),
        _ => init_logging_simple(),
    }
    debug!(config_dir = %cli.config_dir.display(), "configuration loaded");

    let vault = Arc::new(PaperVault::new(config.paper_vault.clone()));
    let optimizer = Arc::new(Optimizer::from_config(&config));
    let orchestrator = Orchestrator::new(vault, optimizer, config.orchestrator.clone());

    match &cli.command {
        Commands::Plan {
            signals,
            model,
            max_single,
            min_div,
        } => cli::plan(&orchestrator, signals, model.as_deref(), *max_single, *min_div)?,
        Commands::Compare { signals } => cli::compare(&orchestrator, signals)?,
        Commands::WhatIf {
            signals,
            model,
            value,
        } => cli::what_if(&orchestrator, signals, model.as_deref(), *value)?,
        Commands::DryRun { request } => cli::dry_run(&orchestrator, request)?,
        Commands::Rebalance { request, settled } => {
            cli::rebalance(&orchestrator, request, *settled).await?
        }
        Commands::Batch { requests } => cli::batch(&orchestrator, requests).await?,
        Commands::Models => cli::models(&orchestrator)?,
    }

    Ok(())
}
