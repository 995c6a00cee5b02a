//! Optimizer facade: validate signals, run a strategy, enforce constraints.
//!
//! Every component that needs an allocation goes through [`Optimizer`];
//! nothing else computes weights directly.

pub mod enforcer;

pub use enforcer::{enforce, STUB_LEG_BPS};

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::config::{AppConfig, ModelsConfig};
use crate::domain::{
    AllocationModel, AllocationPlan, ConstraintDefaults, Constraints, ResolvedConstraints, Signals,
};
use crate::error::Result;
use crate::strategy;

#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    constraints: ConstraintDefaults,
    models: ModelsConfig,
}

/// Available models and their current tunables
#[derive(Debug, Clone, Serialize)]
pub struct ModelCatalog {
    pub available: Vec<AllocationModel>,
    pub default: AllocationModel,
    pub configurations: ModelsConfig,
    pub constraints: ConstraintDefaults,
}

impl Optimizer {
    pub fn new(constraints: ConstraintDefaults, models: ModelsConfig) -> Self {
        Self {
            constraints,
            models,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(cfg.constraints.clone(), cfg.models.clone())
    }

    pub fn resolve(&self, constraints: Option<&Constraints>) -> ResolvedConstraints {
        constraints
            .cloned()
            .unwrap_or_default()
            .resolve(&self.constraints)
    }

    pub fn catalog(&self) -> ModelCatalog {
        ModelCatalog {
            available: AllocationModel::ALL.to_vec(),
            default: AllocationModel::default(),
            configurations: self.models.clone(),
            constraints: self.constraints.clone(),
        }
    }

    /// Produce a constraint-compliant plan using the thread-local RNG
    pub fn optimize(
        &self,
        signals: &Signals,
        model: AllocationModel,
        constraints: Option<&Constraints>,
    ) -> Result<AllocationPlan> {
        self.optimize_with_rng(signals, model, constraints, &mut rand::thread_rng())
    }

    /// Same as [`Optimizer::optimize`] with an injected random source
    pub fn optimize_with_rng<R: Rng + ?Sized>(
        &self,
        signals: &Signals,
        model: AllocationModel,
        constraints: Option<&Constraints>,
        rng: &mut R,
    ) -> Result<AllocationPlan> {
        signals.validate()?;

        let limits = self.resolve(constraints);
        let draft = strategy::run(model, signals, &self.models, rng);
        let draft_confidence = draft.confidence;
        let plan = enforce(draft, signals, &limits);

        debug!(
            model = %model,
            legs = plan.legs.len(),
            confidence = plan.confidence,
            draft_confidence,
            "plan generated"
        );
        Ok(plan)
    }
}
