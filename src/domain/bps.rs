//! Basis-point arithmetic shared by every strategy and the enforcer

use super::plan::Leg;

/// 100% of capital
pub const TOTAL_BPS: u32 = 10_000;

/// Sum of all leg weights
pub fn sum_bps(legs: &[Leg]) -> u32 {
    legs.iter().map(|l| l.target_bps).sum()
}

/// Push the residual `TOTAL_BPS - sum` onto the first leg so the plan sums to
/// exactly 10000. A negative residual the first leg cannot absorb without
/// dropping to zero goes to the largest leg instead.
pub fn renormalize_first_leg(legs: &mut [Leg]) {
    if legs.is_empty() {
        return;
    }
    let diff = TOTAL_BPS as i64 - sum_bps(legs) as i64;
    if diff == 0 {
        return;
    }

    let first = legs[0].target_bps as i64 + diff;
    if first > 0 {
        legs[0].target_bps = first as u32;
    } else if let Some(largest) = legs.iter_mut().max_by_key(|l| l.target_bps) {
        largest.target_bps = (largest.target_bps as i64 + diff).max(0) as u32;
    }
}
