//! Rebalance orchestration
//!
//! Drives the fetch → plan → materiality → execute flow for one vault or a
//! batch of vaults. The [`Orchestrator`] owns no vault state; it holds a
//! shared [`VaultClient`] and a shared [`Optimizer`] and is cheap to clone
//! into spawned tasks.

mod types;

pub use types::{
    BatchEntry, BatchReport, BatchSummary, DryRunReport, OutcomeDetail, RebalanceOutcome,
    RebalanceRequest, RebalanceStatus, SkipReason,
};

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analytics::{self, Comparison};
use crate::config::OrchestratorConfig;
use crate::domain::{AllocationPlan, Constraints, Signals};
use crate::error::{RebalancerError, Result};
use crate::optimizer::Optimizer;
use crate::vault::{VaultClient, VaultSnapshot};

/// Largest difference between a plan leg and the vault's current weight for
/// that protocol. Only the plan's legs are compared; a protocol the vault holds
/// but the plan omits does not count.
pub fn max_drift(plan: &AllocationPlan, current: &VaultSnapshot) -> u32 {
    plan.legs
        .iter()
        .map(|leg| leg.target_bps.abs_diff(current.bps_of(leg.proto)))
        .max()
        .unwrap_or(0)
}

/// Whether any plan leg moves by strictly more than `threshold_bps`
pub fn is_material(plan: &AllocationPlan, current: &VaultSnapshot, threshold_bps: u32) -> bool {
    max_drift(plan, current) > threshold_bps
}

#[derive(Clone)]
pub struct Orchestrator {
    vault: Arc<dyn VaultClient>,
    optimizer: Arc<Optimizer>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        vault: Arc<dyn VaultClient>,
        optimizer: Arc<Optimizer>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            vault,
            optimizer,
            config,
        }
    }

    pub fn optimizer(&self) -> &Optimizer {
        &self.optimizer
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Rebalance a single vault. Collaborator errors are returned to the caller.
    pub async fn rebalance(&self, request: &RebalanceRequest) -> Result<RebalanceOutcome> {
        let (snapshot, plan) = self.prepare(request).await?;
        self.apply(request, &snapshot, &plan).await
    }

    /// Rebalance a single vault, folding vault-side errors into a `Failed` outcome.
    ///
    /// Invalid input is still returned as an error.
    pub async fn rebalance_settled(&self, request: &RebalanceRequest) -> Result<RebalanceOutcome> {
        let (snapshot, plan) = match self.prepare(request).await {
            Ok(prepared) => prepared,
            Err(e) if e.is_vault_side() => return Ok(self.failed(request, None, &e)),
            Err(e) => return Err(e),
        };

        let applied = self.apply(request, &snapshot, &plan).await;
        match applied {
            Err(e) if e.is_vault_side() => Ok(self.failed(request, Some(plan), &e)),
            other => other,
        }
    }

    /// Produce the plan a rebalance would execute without contacting the vault
    pub fn dry_run(&self, request: &RebalanceRequest) -> Result<DryRunReport> {
        let model = request.model();
        let plan = self
            .optimizer
            .optimize(&request.signals, model, request.constraints.as_ref())?;

        info!(
            vault_id = request.vault_id,
            model = %model,
            legs = plan.legs.len(),
            confidence = plan.confidence,
            "dry run plan generated"
        );

        Ok(DryRunReport {
            dry_run: true,
            vault_id: request.vault_id,
            model,
            plan,
            signals: request.signals.clone(),
            constraints: self.optimizer.resolve(request.constraints.as_ref()),
            generated_at: Utc::now(),
        })
    }

    /// Rebalance many vaults concurrently.
    ///
    /// Each request runs in its own task; one vault failing never affects
    /// the others. Entries come back in request order.
    pub async fn batch(&self, requests: Vec<RebalanceRequest>) -> BatchReport {
        info!(count = requests.len(), "starting batch rebalance");

        let (vault_ids, handles): (Vec<u64>, Vec<_>) = requests
            .into_iter()
            .map(|request| {
                let this = self.clone();
                let vault_id = request.vault_id;
                let handle = tokio::spawn(async move { this.rebalance(&request).await });
                (vault_id, handle)
            })
            .unzip();

        let joined = join_all(handles).await;

        let entries: Vec<BatchEntry> = vault_ids
            .into_iter()
            .zip(joined)
            .map(|(vault_id, result)| match result {
                Ok(Ok(outcome)) => BatchEntry {
                    vault_id,
                    success: true,
                    result: Some(outcome),
                    error: None,
                },
                Ok(Err(e)) => {
                    warn!(vault_id, error = %e, "batch entry failed");
                    BatchEntry {
                        vault_id,
                        success: false,
                        result: None,
                        error: Some(e.to_string()),
                    }
                }
                Err(join_err) => {
                    let e = RebalancerError::from(join_err);
                    warn!(vault_id, error = %e, "batch task aborted");
                    BatchEntry {
                        vault_id,
                        success: false,
                        result: None,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();

        let report = BatchReport::from_entries(entries);
        info!(
            total = report.summary.total,
            successful = report.summary.successful,
            failed = report.summary.failed,
            "batch rebalance complete"
        );
        report
    }

    /// Evaluate every model against the same signals
    pub fn compare(&self, signals: &Signals, constraints: Option<&Constraints>) -> Result<Comparison> {
        analytics::compare(
            &self.optimizer,
            signals,
            constraints,
            self.config.projection_value_usd,
        )
    }

    async fn prepare(&self, request: &RebalanceRequest) -> Result<(VaultSnapshot, AllocationPlan)> {
        request.signals.validate()?;

        let snapshot = self.vault.snapshot(request.vault_id).await?;
        debug!(
            vault_id = request.vault_id,
            total_value = %snapshot.total_value,
            "vault snapshot fetched"
        );

        let model = request.model();
        let plan = self
            .optimizer
            .optimize(&request.signals, model, request.constraints.as_ref())?;

        Ok((snapshot, plan))
    }

    async fn apply(
        &self,
        request: &RebalanceRequest,
        snapshot: &VaultSnapshot,
        plan: &AllocationPlan,
    ) -> Result<RebalanceOutcome> {
        let vault_id = request.vault_id;
        let drift = max_drift(plan, snapshot);

        if !is_material(plan, snapshot, self.config.materiality_threshold_bps) {
            info!(
                vault_id,
                drift_bps = drift,
                threshold_bps = self.config.materiality_threshold_bps,
                "rebalance skipped, no significant change"
            );
            return Ok(RebalanceOutcome {
                vault_id,
                status: RebalanceStatus::Skipped,
                model: plan.model,
                plan: Some(plan.clone()),
                max_drift_bps: Some(drift),
                detail: OutcomeDetail::Skipped {
                    reason: SkipReason::NoSignificantChange,
                },
            });
        }

        let receipt = self.vault.execute_rebalance(vault_id, plan).await?;
        info!(
            vault_id,
            drift_bps = drift,
            model = %plan.model,
            tx = %receipt.tx_reference,
            "rebalance executed"
        );

        Ok(RebalanceOutcome {
            vault_id,
            status: RebalanceStatus::Executed,
            model: plan.model,
            plan: Some(plan.clone()),
            max_drift_bps: Some(drift),
            detail: OutcomeDetail::Executed { receipt },
        })
    }

    fn failed(
        &self,
        request: &RebalanceRequest,
        plan: Option<AllocationPlan>,
        error: &RebalancerError,
    ) -> RebalanceOutcome {
        warn!(vault_id = request.vault_id, error = %error, "rebalance failed");
        RebalanceOutcome {
            vault_id: request.vault_id,
            status: RebalanceStatus::Failed,
            model: request.model(),
            plan,
            max_drift_bps: None,
            detail: OutcomeDetail::Failed {
                error: error.to_string(),
            },
        }
    }
}
