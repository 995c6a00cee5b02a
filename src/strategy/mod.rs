//! Allocation strategies
//!
//! Each strategy is a pure function from [`Signals`] to a draft
//! [`AllocationPlan`]. Higher strategies refine the output of the one below:
//! `regime` calls `bandit`, which calls `markowitz`. Drafts are not yet
//! constraint-checked; the optimizer runs them through the enforcer.

pub mod bandit;
pub mod markowitz;
pub mod regime;

pub use bandit::bandit;
pub use markowitz::markowitz;
pub use regime::{regime, MarketRegime};

use rand::Rng;

use crate::config::ModelsConfig;
use crate::domain::{AllocationModel, AllocationPlan, Signals};

/// Run the named strategy against the signals
pub fn run<R: Rng + ?Sized>(
    model: AllocationModel,
    signals: &Signals,
    params: &ModelsConfig,
    rng: &mut R,
) -> AllocationPlan {
    match model {
        AllocationModel::Markowitz => markowitz(signals),
        AllocationModel::Bandit => bandit(signals, rng, &params.bandit),
        AllocationModel::Rl => regime(signals, rng, params),
    }
}
