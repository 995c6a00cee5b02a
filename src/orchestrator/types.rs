use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AllocationModel, AllocationPlan, Constraints, ResolvedConstraints, Signals};
use crate::vault::ExecutionReceipt;

/// One vault's rebalance request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceRequest {
    #[serde(alias = "vault_id")]
    pub vault_id: u64,
    pub signals: Signals,
    #[serde(default)]
    pub model: Option<AllocationModel>,
    #[serde(default)]
    pub constraints: Option<Constraints>,
}

impl RebalanceRequest {
    pub fn new(vault_id: u64, signals: Signals) -> Self {
        Self {
            vault_id,
            signals,
            model: None,
            constraints: None,
        }
    }

    pub fn with_model(mut self, model: AllocationModel) -> Self {
        self.model = Some(model);
        self
    }

    pub fn model(&self) -> AllocationModel {
        self.model.unwrap_or_default()
    }
}

/// Terminal state of a rebalance request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebalanceStatus {
    Executed,
    Skipped,
    Failed,
}

impl std::fmt::Display for RebalanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RebalanceStatus::Executed => write!(f, "executed"),
            RebalanceStatus::Skipped => write!(f, "skipped"),
            RebalanceStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    #[serde(rename = "no-significant-change")]
    NoSignificantChange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OutcomeDetail {
    Executed { receipt: ExecutionReceipt },
    Skipped { reason: SkipReason },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceOutcome {
    pub vault_id: u64,
    pub status: RebalanceStatus,
    pub model: AllocationModel,
    /// Absent when the vault could not be read
    pub plan: Option<AllocationPlan>,
    /// Largest per-protocol difference from the current allocation
    pub max_drift_bps: Option<u32>,
    pub detail: OutcomeDetail,
}

/// Plan preview that never touches the vault
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunReport {
    pub dry_run: bool,
    pub vault_id: u64,
    pub model: AllocationModel,
    pub plan: AllocationPlan,
    pub signals: Signals,
    pub constraints: ResolvedConstraints,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub vault_id: u64,
    pub success: bool,
    pub result: Option<RebalanceOutcome>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Same order as the submitted requests
    pub results: Vec<BatchEntry>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn from_entries(results: Vec<BatchEntry>) -> Self {
        let successful = results.iter().filter(|e| e.success).count();
        let summary = BatchSummary {
            total: results.len(),
            successful,
            failed: results.len() - successful,
        };
        Self { results, summary }
    }
}
