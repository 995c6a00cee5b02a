//! Exploration/exploitation refinement of the baseline

use rand::Rng;
use tracing::trace;

use super::markowitz::markowitz;
use crate::config::BanditParams;
use crate::domain::{renormalize_first_leg, AllocationModel, AllocationPlan, Signals};

/// Largest boost (bps) given to the best protocol
const MAX_BOOST_BPS: u32 = 2000;
/// The boosted leg never exceeds this
const BOOSTED_LEG_CAP_BPS: u32 = 7000;

/// Multi-armed bandit step over the baseline: mostly exploit the highest-APR
/// protocol, occasionally keep the baseline as-is.
pub fn bandit<R: Rng + ?Sized>(sig: &Signals, rng: &mut R, params: &BanditParams) -> AllocationPlan {
    let mut plan = markowitz(sig);
    plan.model = AllocationModel::Bandit;
    if plan.legs.is_empty() {
        return plan;
    }

    let Some(best) = sig.best_apr_protocol() else {
        return plan;
    };

    let explore = rng.gen::<f64>() < params.exploration_rate;
    if explore {
        trace!(best = %best, "bandit: exploring, baseline kept");
    } else if let Some(idx) = plan.legs.iter().position(|l| l.proto == best) {
        let current = plan.legs[idx].target_bps;
        let boost = MAX_BOOST_BPS.min(current * 3 / 10);
        let boosted = BOOSTED_LEG_CAP_BPS.min(current + boost);
        plan.legs[idx].target_bps = boosted;

        // A leg already above the cap is pulled down; the freed bps land on
        // the first leg during renormalization.
        let applied = boosted.saturating_sub(current);
        let others = plan.legs.len() - 1;
        if applied > 0 && others > 0 {
            let reduction = applied / others as u32;
            for (i, leg) in plan.legs.iter_mut().enumerate() {
                if i != idx {
                    leg.target_bps = leg.target_bps.saturating_sub(reduction);
                }
            }
        }
        trace!(best = %best, applied, "bandit: exploiting best protocol");
    }

    renormalize_first_leg(&mut plan.legs);
    plan.recompute_total();
    plan.confidence = plan.confidence.saturating_sub(10).max(30);
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Protocol, TOTAL_BPS};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn signals() -> Signals {
        Signals::new(0.0)
            .with_apr(Protocol::Staking, 0.04)
            .with_apr(Protocol::Lending, 0.04)
            .with_apr(Protocol::LiquidityProvision, 0.12)
    }

    fn exploit() -> BanditParams {
        BanditParams {
            exploration_rate: 0.0,
        }
    }

    fn explore() -> BanditParams {
        BanditParams {
            exploration_rate: 1.0,
        }
    }

    #[test]
    fn exploit_boosts_best_protocol() {
        let mut rng = StdRng::seed_from_u64(7);
        let plan = bandit(&signals(), &mut rng, &exploit());

        // Baseline 2000/2000/6000; boost min(2000, 1800) capped at 7000 → +1000
        assert_eq!(plan.bps_of(Protocol::LiquidityProvision), 7000);
        assert_eq!(plan.bps_of(Protocol::Staking), 1500);
        assert_eq!(plan.bps_of(Protocol::Lending), 1500);
        assert_eq!(plan.total_bps, TOTAL_BPS);
        assert_eq!(plan.model, AllocationModel::Bandit);
    }

    #[test]
    fn explore_keeps_baseline_weights() {
        let mut rng = StdRng::seed_from_u64(7);
        let plan = bandit(&signals(), &mut rng, &explore());
        let base = markowitz(&signals());
        assert_eq!(plan.legs, base.legs);
        assert_eq!(plan.model, AllocationModel::Bandit);
    }

    #[test]
    fn confidence_drops_by_ten_with_floor() {
        let mut rng = StdRng::seed_from_u64(1);
        let base = markowitz(&signals());
        let plan = bandit(&signals(), &mut rng, &explore());
        assert_eq!(plan.confidence, base.confidence - 10);

        let flat = Signals::new(0.0)
            .with_apr(Protocol::Staking, 0.05)
            .with_apr(Protocol::Lending, 0.05);
        // baseline confidence 50 → 40
        assert_eq!(bandit(&flat, &mut rng, &explore()).confidence, 40);
    }

    #[test]
    fn remainder_goes_to_first_leg() {
        let sig = Signals::new(0.0)
            .with_apr(Protocol::Staking, 0.02)
            .with_apr(Protocol::Lending, 0.03)
            .with_apr(Protocol::LiquidityProvision, 0.03)
            .with_apr(Protocol::PerpsHedge, 0.10);
        let mut rng = StdRng::seed_from_u64(3);
        let plan = bandit(&sig, &mut rng, &exploit());

        // Baseline 1110/1667/1667/5556; boost capped at 7000 (+1444), 481 off each other leg
        assert_eq!(plan.bps_of(Protocol::PerpsHedge), 7000);
        assert_eq!(plan.bps_of(Protocol::Lending), 1186);
        assert_eq!(plan.bps_of(Protocol::LiquidityProvision), 1186);
        assert_eq!(plan.bps_of(Protocol::Staking), 628);
        assert_eq!(plan.total_bps, TOTAL_BPS);
    }

    #[test]
    fn empty_signals_stay_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        let plan = bandit(&Signals::new(10.0), &mut rng, &exploit());
        assert!(plan.is_empty());
        assert_eq!(plan.confidence, 0);
    }
}
