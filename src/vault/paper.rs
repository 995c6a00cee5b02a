//! In-memory vault used for dry runs, drills and tests

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

use super::{ExecutionReceipt, VaultClient, VaultSnapshot};
use crate::config::PaperVaultConfig;
use crate::domain::{AllocationPlan, Protocol};
use crate::error::{RebalancerError, Result};

/// Which collaborator call an injected failure should break
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    Snapshot,
    Execute,
}

/// Simulated vault collaborator. Unknown vault ids are created on first use
/// with the configured seed position.
pub struct PaperVault {
    config: PaperVaultConfig,
    vaults: DashMap<u64, VaultSnapshot>,
    failures: DashMap<u64, FailurePoint>,
}

fn seed_allocation() -> BTreeMap<Protocol, u32> {
    BTreeMap::from([
        (Protocol::Staking, 4000),
        (Protocol::Lending, 3000),
        (Protocol::LiquidityProvision, 2000),
        (Protocol::PerpsHedge, 1000),
    ])
}

impl PaperVault {
    pub fn new(config: PaperVaultConfig) -> Self {
        Self {
            config,
            vaults: DashMap::new(),
            failures: DashMap::new(),
        }
    }

    /// Register a vault with an explicit allocation
    pub fn with_vault(self, vault_id: u64, allocation: BTreeMap<Protocol, u32>) -> Self {
        let mut snapshot = self.seed(vault_id);
        snapshot.current_allocation = allocation;
        self.vaults.insert(vault_id, snapshot);
        self
    }

    /// Make every future call at `point` fail for this vault
    pub fn fail_on(&self, vault_id: u64, point: FailurePoint) {
        self.failures.insert(vault_id, point);
    }

    pub fn clear_failure(&self, vault_id: u64) {
        self.failures.remove(&vault_id);
    }

    fn seed(&self, vault_id: u64) -> VaultSnapshot {
        VaultSnapshot {
            vault_id,
            total_value: self.config.initial_value_usd,
            current_allocation: seed_allocation(),
            last_rebalance_time: Utc::now() - Duration::hours(self.config.last_rebalance_age_hours),
        }
    }

    fn injected(&self, vault_id: u64, point: FailurePoint) -> bool {
        self.failures
            .get(&vault_id)
            .map(|p| *p == point)
            .unwrap_or(false)
    }
}

impl Default for PaperVault {
    fn default() -> Self {
        Self::new(PaperVaultConfig::default())
    }
}

#[async_trait]
impl VaultClient for PaperVault {
    async fn snapshot(&self, vault_id: u64) -> Result<VaultSnapshot> {
        if self.injected(vault_id, FailurePoint::Snapshot) {
            warn!(vault_id, "paper vault: injected snapshot failure");
            return Err(RebalancerError::Vault {
                vault_id,
                reason: "injected snapshot failure".to_string(),
            });
        }

        let snapshot = self
            .vaults
            .entry(vault_id)
            .or_insert_with(|| self.seed(vault_id))
            .clone();
        Ok(snapshot)
    }

    async fn execute_rebalance(
        &self,
        vault_id: u64,
        plan: &AllocationPlan,
    ) -> Result<ExecutionReceipt> {
        if self.injected(vault_id, FailurePoint::Execute) {
            warn!(vault_id, "paper vault: injected execution failure");
            return Err(RebalancerError::Execution {
                vault_id,
                reason: "injected execution failure".to_string(),
            });
        }

        let now = Utc::now();
        let allocation: BTreeMap<Protocol, u32> =
            plan.legs.iter().map(|l| (l.proto, l.target_bps)).collect();

        let mut entry = self
            .vaults
            .entry(vault_id)
            .or_insert_with(|| self.seed(vault_id));
        entry.current_allocation = allocation;
        entry.last_rebalance_time = now;
        drop(entry);

        let tx_reference = format!("0x{}", Uuid::new_v4().simple());
        info!(vault_id, tx = %tx_reference, legs = plan.legs.len(), "paper vault: rebalance applied");

        Ok(ExecutionReceipt {
            vault_id,
            success: true,
            tx_reference,
            executed_at: now,
        })
    }
}
