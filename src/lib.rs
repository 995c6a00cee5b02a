pub mod analytics;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod optimizer;
pub mod orchestrator;
pub mod strategy;
pub mod vault;

pub use config::AppConfig;
pub use domain::{
    AllocationModel, AllocationPlan, Constraints, Leg, Protocol, ResolvedConstraints, Signals,
    TOTAL_BPS,
};
pub use error::{RebalancerError, Result};
pub use optimizer::Optimizer;
pub use orchestrator::{
    BatchReport, DryRunReport, Orchestrator, RebalanceOutcome, RebalanceRequest, RebalanceStatus,
};
pub use vault::{FailurePoint, PaperVault, VaultClient};
