//! Volatility-regime refinement of the bandit plan
//!
//! Classifies the market into one of three regimes from the portfolio risk score:
//! - HighVol: concentration is capped and freed weight spread evenly
//! - LowVol: the highest-APR leg is allowed to concentrate further
//! - Moderate: the bandit plan passes through unchanged
//!
//! This is a fixed heuristic, not a learned policy.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::bandit::bandit;
use crate::config::{ModelsConfig, RegimeParams};
use crate::domain::{
    renormalize_first_leg, sum_bps, AllocationModel, AllocationPlan, Signals, TOTAL_BPS,
};

/// Per-leg ceiling applied in the high-volatility regime
const HIGH_VOL_LEG_CAP_BPS: u32 = 4000;
/// Largest boost (bps) for the top leg in the low-volatility regime
const LOW_VOL_MAX_BOOST_BPS: u32 = 1500;
/// The top leg never ends above this in the low-volatility regime
const LOW_VOL_TOP_LEG_CAP_BPS: u32 = 6500;

/// Market regime classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketRegime {
    /// Elevated risk, push toward diversification
    HighVol,
    /// Neither bucket, leave the allocation alone
    Moderate,
    /// Quiet market, allow more concentration
    LowVol,
}

impl MarketRegime {
    pub fn classify(risk: f64, params: &RegimeParams) -> Self {
        let market_volatility = risk / 100.0;
        if market_volatility > params.high_vol_threshold {
            MarketRegime::HighVol
        } else if market_volatility < params.low_vol_threshold {
            MarketRegime::LowVol
        } else {
            MarketRegime::Moderate
        }
    }
}

impl std::fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketRegime::HighVol => write!(f, "HighVol"),
            MarketRegime::Moderate => write!(f, "Moderate"),
            MarketRegime::LowVol => write!(f, "LowVol"),
        }
    }
}

pub fn regime<R: Rng + ?Sized>(sig: &Signals, rng: &mut R, params: &ModelsConfig) -> AllocationPlan {
    let mut plan = bandit(sig, rng, &params.bandit);
    plan.model = AllocationModel::Rl;
    if plan.legs.is_empty() {
        return plan;
    }

    let regime = MarketRegime::classify(sig.risk, &params.rl);
    match regime {
        MarketRegime::HighVol => spread_out(&mut plan),
        MarketRegime::LowVol => concentrate(&mut plan, sig),
        MarketRegime::Moderate => {}
    }
    debug!(regime = %regime, legs = plan.legs.len(), "regime adjustment applied");

    renormalize_first_leg(&mut plan.legs);
    plan.recompute_total();
    plan.confidence = (plan.confidence + 5).min(95);
    plan
}

fn spread_out(plan: &mut AllocationPlan) {
    for leg in plan.legs.iter_mut() {
        leg.target_bps = leg.target_bps.min(HIGH_VOL_LEG_CAP_BPS);
    }

    let total = sum_bps(&plan.legs);
    if total < TOTAL_BPS {
        let freed = TOTAL_BPS - total;
        let n = plan.legs.len() as u32;
        let per_leg = freed / n;
        for leg in plan.legs.iter_mut() {
            leg.target_bps += per_leg;
        }
        plan.legs[0].target_bps += freed % n;
    }
}

fn concentrate(plan: &mut AllocationPlan, sig: &Signals) {
    // Highest APR among the legs; ties keep plan order
    let mut top_idx = 0;
    for (i, leg) in plan.legs.iter().enumerate() {
        if sig.apr_of(leg.proto) > sig.apr_of(plan.legs[top_idx].proto) {
            top_idx = i;
        }
    }

    let current = plan.legs[top_idx].target_bps;
    let boost = LOW_VOL_MAX_BOOST_BPS.min(current / 5);
    let top = LOW_VOL_TOP_LEG_CAP_BPS.min(current + boost);
    plan.legs[top_idx].target_bps = top;

    let total_other: u32 = plan
        .legs
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != top_idx)
        .map(|(_, l)| l.target_bps)
        .sum();
    let target_other = (TOTAL_BPS - top) as f64;

    if total_other > 0 {
        for (i, leg) in plan.legs.iter_mut().enumerate() {
            if i != top_idx {
                leg.target_bps =
                    (leg.target_bps as f64 / total_other as f64 * target_other).round() as u32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BanditParams;
    use crate::domain::Protocol;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn explore_only() -> ModelsConfig {
        ModelsConfig {
            bandit: BanditParams {
                exploration_rate: 1.0,
            },
            rl: RegimeParams::default(),
        }
    }

    #[test]
    fn classification_thresholds() {
        let p = RegimeParams::default();
        assert_eq!(MarketRegime::classify(80.0, &p), MarketRegime::HighVol);
        assert_eq!(MarketRegime::classify(70.0, &p), MarketRegime::Moderate);
        assert_eq!(MarketRegime::classify(30.0, &p), MarketRegime::Moderate);
        assert_eq!(MarketRegime::classify(29.0, &p), MarketRegime::LowVol);
    }

    #[test]
    fn high_vol_spreads_weight() {
        let sig = Signals::new(80.0)
            .with_apr(Protocol::Staking, 0.30)
            .with_apr(Protocol::Lending, 0.10)
            .with_apr(Protocol::LiquidityProvision, 0.10)
            .with_volatility(Protocol::Staking, 0.05)
            .with_volatility(Protocol::Lending, 0.05)
            .with_volatility(Protocol::LiquidityProvision, 0.05);
        let mut rng = StdRng::seed_from_u64(11);
        let plan = regime(&sig, &mut rng, &explore_only());

        // Draft 6842/1579/1579 → capped 4000/1579/1579 → 2842 freed, 947 each + 1 on leg 0
        assert_eq!(plan.bps_of(Protocol::Staking), 4948);
        assert_eq!(plan.bps_of(Protocol::Lending), 2526);
        assert_eq!(plan.bps_of(Protocol::LiquidityProvision), 2526);
        assert_eq!(plan.total_bps, TOTAL_BPS);
        assert_eq!(plan.model, AllocationModel::Rl);
    }

    #[test]
    fn low_vol_concentrates_top_apr() {
        let sig = Signals::new(10.0)
            .with_apr(Protocol::Staking, 0.10)
            .with_apr(Protocol::Lending, 0.06)
            .with_apr(Protocol::LiquidityProvision, 0.04);
        let mut rng = StdRng::seed_from_u64(11);
        let plan = regime(&sig, &mut rng, &explore_only());

        // Draft 5714/2857/1429 → top boosted to min(6500, 6856)
        assert_eq!(plan.bps_of(Protocol::Staking), 6500);
        assert_eq!(plan.bps_of(Protocol::Lending), 2333);
        assert_eq!(plan.bps_of(Protocol::LiquidityProvision), 1167);
        assert_eq!(plan.total_bps, TOTAL_BPS);
        // 56 baseline, -10 bandit, +5 regime
        assert_eq!(plan.confidence, 51);
    }

    #[test]
    fn moderate_regime_passes_through() {
        let sig = Signals::new(50.0)
            .with_apr(Protocol::Staking, 0.20)
            .with_apr(Protocol::Lending, 0.15);
        let mut rng = StdRng::seed_from_u64(5);
        let cfg = explore_only();
        let draft = bandit(&sig, &mut StdRng::seed_from_u64(5), &cfg.bandit);
        let plan = regime(&sig, &mut rng, &cfg);
        assert_eq!(plan.legs, draft.legs);
        assert_eq!(plan.confidence, draft.confidence + 5);
    }

    #[test]
    fn empty_signals_stay_empty() {
        let mut rng = StdRng::seed_from_u64(5);
        let plan = regime(&Signals::new(90.0), &mut rng, &ModelsConfig::default());
        assert!(plan.is_empty());
        assert_eq!(plan.total_bps, 0);
        assert_eq!(plan.model, AllocationModel::Rl);
    }
}
