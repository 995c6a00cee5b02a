//! Projected-return and risk analytics over allocation plans
//!
//! Used by model comparison and the what-if report. All figures are simple
//! linear estimates: weighted APR over a 30-day horizon and a fixed risk
//! score per protocol.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{AllocationModel, AllocationPlan, Constraints, Signals, TOTAL_BPS};
use crate::error::Result;
use crate::optimizer::Optimizer;

pub const PROJECTION_HORIZON: &str = "30d";

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn weight(bps: u32) -> f64 {
    bps as f64 / TOTAL_BPS as f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    /// Percent, two decimals
    pub weighted_apr_pct: f64,
    /// Percent, two decimals
    pub monthly_return_pct: f64,
    pub projected_value: Decimal,
    pub expected_gain: Decimal,
}

pub fn project_returns(plan: &AllocationPlan, sig: &Signals, value: Decimal) -> Projection {
    let weighted_apr: f64 = plan
        .legs
        .iter()
        .map(|l| weight(l.target_bps) * sig.apr_of(l.proto))
        .sum();
    let monthly_return = weighted_apr / 12.0;

    let growth = Decimal::from_f64(monthly_return).unwrap_or_default();
    let projected_value = (value * (Decimal::ONE + growth)).round();

    Projection {
        weighted_apr_pct: round_to(weighted_apr * 100.0, 2),
        monthly_return_pct: round_to(monthly_return * 100.0, 2),
        projected_value,
        expected_gain: projected_value - value,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetrics {
    pub portfolio_risk: f64,
    /// Higher is better, capped at 100
    pub diversification_score: f64,
    pub risk_level: RiskLevel,
    pub max_drawdown: f64,
    pub volatility: f64,
}

pub fn risk_metrics(plan: &AllocationPlan) -> RiskMetrics {
    let portfolio_risk: f64 = plan
        .legs
        .iter()
        .map(|l| weight(l.target_bps) * l.proto.risk_score())
        .sum();

    let diversification = if plan.legs.is_empty() {
        0.0
    } else {
        (plan.legs.len() as f64 * 25.0 - plan.max_leg_bps() as f64 / 100.0).min(100.0)
    };

    let risk_level = if portfolio_risk < 30.0 {
        RiskLevel::Low
    } else if portfolio_risk < 60.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    };

    RiskMetrics {
        portfolio_risk: portfolio_risk.round(),
        diversification_score: diversification.round(),
        risk_level,
        max_drawdown: (portfolio_risk * 0.8).round(),
        volatility: (portfolio_risk * 1.2).round(),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelComparison {
    pub model: AllocationModel,
    pub plan: AllocationPlan,
    pub confidence: u32,
    pub projected_apr_pct: f64,
    pub risk_score: f64,
    pub diversification: f64,
}

impl ModelComparison {
    /// Return per unit of risk
    pub fn score(&self) -> f64 {
        self.projected_apr_pct / (self.risk_score + 1.0)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub models: Vec<ModelComparison>,
    pub recommended: AllocationModel,
    pub reasoning: String,
}

pub fn compare(
    optimizer: &Optimizer,
    sig: &Signals,
    constraints: Option<&Constraints>,
    value: Decimal,
) -> Result<Comparison> {
    compare_with_rng(optimizer, sig, constraints, value, &mut rand::thread_rng())
}

/// Run every model against the same signals and recommend the best
/// risk-adjusted one. Ties keep the earlier model.
pub fn compare_with_rng<R: Rng + ?Sized>(
    optimizer: &Optimizer,
    sig: &Signals,
    constraints: Option<&Constraints>,
    value: Decimal,
    rng: &mut R,
) -> Result<Comparison> {
    let mut models = Vec::with_capacity(AllocationModel::ALL.len());
    for model in AllocationModel::ALL {
        let plan = optimizer.optimize_with_rng(sig, model, constraints, rng)?;
        let projection = project_returns(&plan, sig, value);
        let risk = risk_metrics(&plan);
        models.push(ModelComparison {
            model,
            confidence: plan.confidence,
            plan,
            projected_apr_pct: projection.weighted_apr_pct,
            risk_score: risk.portfolio_risk,
            diversification: risk.diversification_score,
        });
    }

    let mut best = 0;
    for (i, entry) in models.iter().enumerate().skip(1) {
        if entry.score() > models[best].score() {
            best = i;
        }
    }
    let winner = &models[best];
    let reasoning = format!(
        "Best risk-adjusted return: {}% APR with {} risk score",
        winner.projected_apr_pct, winner.risk_score
    );
    info!(recommended = %winner.model, score = winner.score(), "model comparison complete");

    Ok(Comparison {
        recommended: winner.model,
        reasoning,
        models,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatIfReport {
    pub model: AllocationModel,
    pub portfolio_value: Decimal,
    pub plan: AllocationPlan,
    pub projections: Projection,
    pub time_horizon: &'static str,
    pub risk: RiskMetrics,
    pub comparison: Comparison,
    pub generated_at: DateTime<Utc>,
}

/// Plan, projections, risk and cross-model comparison for one scenario
pub fn what_if(
    optimizer: &Optimizer,
    sig: &Signals,
    model: AllocationModel,
    constraints: Option<&Constraints>,
    value: Decimal,
) -> Result<WhatIfReport> {
    let plan = optimizer.optimize(sig, model, constraints)?;
    let projections = project_returns(&plan, sig, value);
    let risk = risk_metrics(&plan);
    let comparison = compare(optimizer, sig, constraints, value)?;

    Ok(WhatIfReport {
        model,
        portfolio_value: value,
        plan,
        projections,
        time_horizon: PROJECTION_HORIZON,
        risk,
        comparison,
        generated_at: Utc::now(),
    })
}
