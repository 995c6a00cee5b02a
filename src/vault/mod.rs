//! Vault collaborator boundary
//!
//! The rebalancer never moves funds itself. It reads vault state and asks a
//! [`VaultClient`] to execute a new allocation; whether that client talks to
//! a chain, a queue, or memory is its own concern.

pub mod paper;

pub use paper::{FailurePoint, PaperVault};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{AllocationPlan, Protocol};
use crate::error::Result;

/// Read model of a vault's current position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultSnapshot {
    pub vault_id: u64,
    pub total_value: Decimal,
    /// Protocol → current weight in bps
    pub current_allocation: BTreeMap<Protocol, u32>,
    pub last_rebalance_time: DateTime<Utc>,
}

impl VaultSnapshot {
    pub fn bps_of(&self, proto: Protocol) -> u32 {
        self.current_allocation.get(&proto).copied().unwrap_or(0)
    }
}

/// Result of a successful execute call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReceipt {
    pub vault_id: u64,
    pub success: bool,
    pub tx_reference: String,
    pub executed_at: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VaultClient: Send + Sync {
    /// Current allocation and value of a vault
    async fn snapshot(&self, vault_id: u64) -> Result<VaultSnapshot>;

    /// Move the vault to the given allocation
    async fn execute_rebalance(
        &self,
        vault_id: u64,
        plan: &AllocationPlan,
    ) -> Result<ExecutionReceipt>;
}
