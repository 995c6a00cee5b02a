//! Constraint enforcement and exact-sum normalization
//!
//! Takes any draft plan and returns one that satisfies the hard limits:
//! 1. clamp legs above the per-leg cap
//! 2. hand the clamped weight to legs with headroom
//! 3. add 100-bps stub legs until the diversification minimum is met, or
//!    until there are enough legs for the cap to be satisfiable
//! 4. normalize so the plan sums to exactly 10000
//! 5. drop zero-weight legs
//! 6. lower confidence when the cap moved weight onto other legs

use tracing::debug;

use crate::domain::{
    renormalize_first_leg, sum_bps, AllocationPlan, Leg, ResolvedConstraints, Signals, TOTAL_BPS,
};

/// Weight given to a protocol added only to satisfy diversification
pub const STUB_LEG_BPS: u32 = 100;
/// Confidence lost when the cap bites
const CAP_CONFIDENCE_PENALTY: u32 = 15;
const MIN_CONFIDENCE_AFTER_PENALTY: u32 = 20;

pub fn enforce(
    mut plan: AllocationPlan,
    sig: &Signals,
    constraints: &ResolvedConstraints,
) -> AllocationPlan {
    let cap = constraints.max_single_allocation_bps.max(1);

    // Zero-weight draft legs do not count toward diversification
    plan.legs.retain(|l| l.target_bps > 0);

    let mut total_reduction = 0u32;
    for leg in plan.legs.iter_mut() {
        if leg.target_bps > cap {
            total_reduction += leg.target_bps - cap;
            leg.target_bps = cap;
        }
    }

    let mut placed = 0u32;
    if total_reduction > 0 {
        let unplaced = redistribute(&mut plan.legs, total_reduction, cap);
        placed = total_reduction - unplaced;
        debug!(
            model = %plan.model,
            cap,
            total_reduction,
            unplaced,
            "max single allocation enforced"
        );
    }

    // Fewer than ceil(10000 / cap) legs cannot sum to 10000 without a leg above the cap
    let required_legs = constraints
        .min_diversification
        .max(TOTAL_BPS.div_ceil(cap) as usize);
    let mut stubs_added = 0usize;
    if plan.legs.len() < required_legs {
        let unused: Vec<_> = sig
            .eligible_protocols()
            .filter(|p| !plan.legs.iter().any(|l| l.proto == *p))
            .collect();
        for proto in unused {
            if plan.legs.len() >= required_legs {
                break;
            }
            plan.legs.push(Leg::new(proto, STUB_LEG_BPS));
            stubs_added += 1;
        }
        if plan.legs.len() < constraints.min_diversification {
            debug!(
                legs = plan.legs.len(),
                required = constraints.min_diversification,
                "not enough eligible protocols for diversification minimum"
            );
        }
    }

    normalize_exact(&mut plan.legs, cap);
    plan.legs.retain(|l| l.target_bps > 0);

    // A clamp that no other leg could absorb is undone by normalization, so
    // it does not cost confidence
    if total_reduction > 0 && (placed > 0 || stubs_added > 0) {
        plan.confidence = plan
            .confidence
            .saturating_sub(CAP_CONFIDENCE_PENALTY)
            .max(MIN_CONFIDENCE_AFTER_PENALTY);
    }
    plan.recompute_total();
    plan
}

/// Spread `amount` over legs below the cap: even split first, then the
/// remainder one bps at a time in leg order. Returns what could not be placed.
fn redistribute(legs: &mut [Leg], amount: u32, cap: u32) -> u32 {
    let eligible: Vec<usize> = legs
        .iter()
        .enumerate()
        .filter(|(_, l)| l.target_bps < cap)
        .map(|(i, _)| i)
        .collect();
    if eligible.is_empty() {
        return amount;
    }

    let n = eligible.len() as u32;
    let per_leg = amount / n;
    let mut remainder = amount % n;
    let mut placed = 0;

    for i in eligible {
        let leg = &mut legs[i];
        let can_add = per_leg.min(cap - leg.target_bps);
        leg.target_bps += can_add;
        placed += can_add;
        if remainder > 0 && leg.target_bps < cap {
            leg.target_bps += 1;
            remainder -= 1;
            placed += 1;
        }
    }

    amount - placed
}

/// Scale legs proportionally toward 10000, put the rounding residual on the
/// first leg, then move anything pushed over the cap onto legs with headroom.
fn normalize_exact(legs: &mut [Leg], cap: u32) {
    if legs.is_empty() {
        return;
    }

    let total = sum_bps(legs);
    if total != TOTAL_BPS {
        if total > 0 {
            let diff = TOTAL_BPS as f64 - total as f64;
            for leg in legs.iter_mut() {
                let adjustment = (diff * leg.target_bps as f64 / total as f64).round() as i64;
                leg.target_bps = (leg.target_bps as i64 + adjustment).max(0) as u32;
            }
        }
        renormalize_first_leg(legs);
    }

    spill_over_cap(legs, cap);
}

/// Total-preserving: weight above the cap fills headroom in leg order. If no
/// headroom is left the excess stays on the first leg, since the exact total
/// takes precedence over the cap.
fn spill_over_cap(legs: &mut [Leg], cap: u32) {
    let mut excess = 0u32;
    for leg in legs.iter_mut() {
        if leg.target_bps > cap {
            excess += leg.target_bps - cap;
            leg.target_bps = cap;
        }
    }
    if excess == 0 {
        return;
    }

    for leg in legs.iter_mut() {
        if excess == 0 {
            break;
        }
        let add = (cap - leg.target_bps).min(excess);
        leg.target_bps += add;
        excess -= add;
    }

    if excess > 0 {
        legs[0].target_bps += excess;
    }
}
