use thiserror::Error;

/// Main error type for the rebalancer
#[derive(Error, Debug)]
pub enum RebalancerError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Input errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // Vault collaborator errors
    #[error("Vault {vault_id} unavailable: {reason}")]
    Vault { vault_id: u64, reason: String },

    #[error("Rebalance execution failed for vault {vault_id}: {reason}")]
    Execution { vault_id: u64, reason: String },

    // Concurrency errors
    #[error("Task join error: {0}")]
    TaskJoin(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RebalancerError {
    /// Errors raised by the vault collaborator rather than by our own computation
    pub fn is_vault_side(&self) -> bool {
        matches!(
            self,
            RebalancerError::Vault { .. } | RebalancerError::Execution { .. }
        )
    }
}

impl From<tokio::task::JoinError> for RebalancerError {
    fn from(e: tokio::task::JoinError) -> Self {
        RebalancerError::TaskJoin(e.to_string())
    }
}

/// Result type alias for RebalancerError
pub type Result<T> = std::result::Result<T, RebalancerError>;
