use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::analytics;
use crate::domain::{AllocationModel, Constraints, Signals};
use crate::error::Result;
use crate::orchestrator::{Orchestrator, RebalanceRequest};

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(version)]
#[command(about = "DeFi vault allocation optimizer and rebalance orchestrator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding default.toml and environment overrides
    #[arg(short, long, default_value = "config", global = true)]
    pub config_dir: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a constraint-compliant allocation plan
    Plan {
        /// Signals JSON file
        #[arg(short, long)]
        signals: PathBuf,
        /// Strategy (markowitz, bandit, rl); unknown names use rl
        #[arg(short, long)]
        model: Option<String>,
        /// Per-protocol cap override in bps
        #[arg(long)]
        max_single: Option<u32>,
        /// Minimum number of legs override
        #[arg(long)]
        min_div: Option<usize>,
    },
    /// Run every strategy and recommend one
    Compare {
        /// Signals JSON file
        #[arg(short, long)]
        signals: PathBuf,
    },
    /// Plan plus projected returns, risk metrics and model comparison
    WhatIf {
        /// Signals JSON file
        #[arg(short, long)]
        signals: PathBuf,
        #[arg(short, long)]
        model: Option<String>,
        /// Portfolio value in USD (defaults to orchestrator.projection_value_usd)
        #[arg(long)]
        value: Option<Decimal>,
    },
    /// Show the plan a rebalance would execute without touching the vault
    DryRun {
        /// Rebalance request JSON file
        #[arg(short, long)]
        request: PathBuf,
    },
    /// Rebalance one vault
    Rebalance {
        /// Rebalance request JSON file
        #[arg(short, long)]
        request: PathBuf,
        /// Report vault failures as a failed outcome instead of an error
        #[arg(long)]
        settled: bool,
    },
    /// Rebalance many vaults concurrently
    Batch {
        /// JSON array of rebalance requests
        #[arg(short, long)]
        requests: PathBuf,
    },
    /// List available models and their configuration
    Models,
}

fn model_arg(model: Option<&str>) -> AllocationModel {
    model.map(AllocationModel::parse_or_default).unwrap_or_default()
}

fn read_file(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(raw)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = read_file(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn read_signals(path: &Path) -> Result<Signals> {
    Signals::from_json(&read_file(path)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn plan(
    orchestrator: &Orchestrator,
    signals: &Path,
    model: Option<&str>,
    max_single: Option<u32>,
    min_div: Option<usize>,
) -> Result<()> {
    let signals = read_signals(signals)?;
    let constraints = Constraints {
        max_single_allocation: max_single,
        min_diversification: min_div,
        risk_tolerance: None,
    };
    let plan = orchestrator
        .optimizer()
        .optimize(&signals, model_arg(model), Some(&constraints))?;
    print_json(&plan)
}

pub fn compare(orchestrator: &Orchestrator, signals: &Path) -> Result<()> {
    let signals = read_signals(signals)?;
    print_json(&orchestrator.compare(&signals, None)?)
}

pub fn what_if(
    orchestrator: &Orchestrator,
    signals: &Path,
    model: Option<&str>,
    value: Option<Decimal>,
) -> Result<()> {
    let signals = read_signals(signals)?;
    let value = value.unwrap_or(orchestrator.config().projection_value_usd);
    let report = analytics::what_if(
        orchestrator.optimizer(),
        &signals,
        model_arg(model),
        None,
        value,
    )?;
    print_json(&report)
}

pub fn dry_run(orchestrator: &Orchestrator, request: &Path) -> Result<()> {
    let request: RebalanceRequest = read_json(request)?;
    print_json(&orchestrator.dry_run(&request)?)
}

pub async fn rebalance(orchestrator: &Orchestrator, request: &Path, settled: bool) -> Result<()> {
    let request: RebalanceRequest = read_json(request)?;
    let outcome = if settled {
        orchestrator.rebalance_settled(&request).await?
    } else {
        orchestrator.rebalance(&request).await?
    };
    print_json(&outcome)
}

pub async fn batch(orchestrator: &Orchestrator, requests: &Path) -> Result<()> {
    let requests: Vec<RebalanceRequest> = read_json(requests)?;
    print_json(&orchestrator.batch(requests).await)
}

pub fn models(orchestrator: &Orchestrator) -> Result<()> {
    print_json(&orchestrator.optimizer().catalog())
}
