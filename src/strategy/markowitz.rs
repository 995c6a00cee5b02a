//! Risk-adjusted mean-variance baseline

use crate::domain::{
    renormalize_first_leg, AllocationModel, AllocationPlan, Leg, Signals, TOTAL_BPS,
};

/// Largest APR haircut a protocol can take for volatility
const MAX_RISK_PENALTY: f64 = 0.5;

/// Baseline allocation proportional to volatility-penalized APR
pub fn markowitz(sig: &Signals) -> AllocationPlan {
    if sig.apr.is_empty() {
        return AllocationPlan::empty(AllocationModel::Markowitz);
    }

    let adjusted: Vec<(_, f64)> = sig
        .apr
        .iter()
        .map(|(proto, apr)| {
            let penalty = (sig.volatility_of(*proto) * sig.risk / 100.0).min(MAX_RISK_PENALTY);
            (*proto, (apr - penalty).max(0.0))
        })
        .collect();

    let sum: f64 = adjusted.iter().map(|(_, v)| v).sum();
    if sum <= 0.0 {
        // Every leg would round to zero
        return AllocationPlan::empty(AllocationModel::Markowitz);
    }

    let mut legs: Vec<Leg> = adjusted
        .iter()
        .map(|(proto, v)| Leg::new(*proto, (v / sum * TOTAL_BPS as f64).round() as u32))
        .collect();
    renormalize_first_leg(&mut legs);
    legs.retain(|l| l.target_bps > 0);

    let max_apr = sig.apr.values().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min_apr = sig.apr.values().cloned().fold(f64::INFINITY, f64::min);
    let confidence = (50.0 + (max_apr - min_apr) * 100.0).min(90.0).round().max(0.0) as u32;

    let mut plan = AllocationPlan {
        legs,
        total_bps: 0,
        confidence,
        model: AllocationModel::Markowitz,
    };
    plan.recompute_total();
    plan
}
