use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use super::bps::{sum_bps, TOTAL_BPS};
use super::protocol::Protocol;
use crate::error::RebalancerError;

/// Allocation strategy, in increasing order of refinement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationModel {
    /// Risk-adjusted mean-variance baseline
    Markowitz,
    /// Exploration/exploitation refinement of the baseline
    Bandit,
    /// Volatility-regime refinement of the bandit plan
    Rl,
}

impl AllocationModel {
    pub const ALL: [AllocationModel; 3] = [
        AllocationModel::Markowitz,
        AllocationModel::Bandit,
        AllocationModel::Rl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationModel::Markowitz => "markowitz",
            AllocationModel::Bandit => "bandit",
            AllocationModel::Rl => "rl",
        }
    }

    /// Lenient lookup: unknown names resolve to the most refined model
    pub fn parse_or_default(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl Default for AllocationModel {
    fn default() -> Self {
        AllocationModel::Rl
    }
}

impl fmt::Display for AllocationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AllocationModel {
    type Err = RebalancerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markowitz" => Ok(AllocationModel::Markowitz),
            "bandit" => Ok(AllocationModel::Bandit),
            "rl" => Ok(AllocationModel::Rl),
            other => Err(RebalancerError::Validation(format!(
                "unknown model: {}",
                other
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for AllocationModel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(AllocationModel::parse_or_default(&name))
    }
}

/// One protocol's target weight inside a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub proto: Protocol,
    /// 0..=10000
    pub target_bps: u32,
}

impl Leg {
    pub fn new(proto: Protocol, target_bps: u32) -> Self {
        Self { proto, target_bps }
    }
}

/// Target allocation produced by a strategy and finalized by the enforcer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPlan {
    pub legs: Vec<Leg>,
    /// 10000 when `legs` is non-empty, 0 otherwise
    pub total_bps: u32,
    /// 0-100
    pub confidence: u32,
    pub model: AllocationModel,
}

impl AllocationPlan {
    pub fn empty(model: AllocationModel) -> Self {
        Self {
            legs: Vec::new(),
            total_bps: 0,
            confidence: 0,
            model,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// Weight of a protocol, 0 when it has no leg
    pub fn bps_of(&self, proto: Protocol) -> u32 {
        self.legs
            .iter()
            .find(|l| l.proto == proto)
            .map(|l| l.target_bps)
            .unwrap_or(0)
    }

    pub fn max_leg_bps(&self) -> u32 {
        self.legs.iter().map(|l| l.target_bps).max().unwrap_or(0)
    }

    pub fn recompute_total(&mut self) {
        self.total_bps = sum_bps(&self.legs);
    }
}

/// Default hard limits, overridable per request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintDefaults {
    /// Upper bound per leg
    #[serde(default = "default_max_single_allocation_bps")]
    pub max_single_allocation_bps: u32,
    /// Minimum number of legs
    #[serde(default = "default_min_diversification")]
    pub min_diversification: usize,
    /// 0-100, informational
    #[serde(default = "default_risk_tolerance")]
    pub default_risk_tolerance: f64,
}

fn default_max_single_allocation_bps() -> u32 {
    7000
}
fn default_min_diversification() -> usize {
    2
}
fn default_risk_tolerance() -> f64 {
    50.0
}

impl Default for ConstraintDefaults {
    fn default() -> Self {
        Self {
            max_single_allocation_bps: default_max_single_allocation_bps(),
            min_diversification: default_min_diversification(),
            default_risk_tolerance: default_risk_tolerance(),
        }
    }
}

/// Caller-supplied constraint overrides. Zero means "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(default, alias = "max_single_allocation_bps")]
    pub max_single_allocation: Option<u32>,
    #[serde(default, alias = "min_diversification")]
    pub min_diversification: Option<usize>,
    #[serde(default, alias = "risk_tolerance")]
    pub risk_tolerance: Option<f64>,
}

impl Constraints {
    pub fn resolve(&self, defaults: &ConstraintDefaults) -> ResolvedConstraints {
        ResolvedConstraints {
            max_single_allocation_bps: self
                .max_single_allocation
                .filter(|v| *v > 0)
                .unwrap_or(defaults.max_single_allocation_bps)
                .min(TOTAL_BPS),
            min_diversification: self
                .min_diversification
                .filter(|v| *v > 0)
                .unwrap_or(defaults.min_diversification),
            risk_tolerance: self
                .risk_tolerance
                .filter(|v| *v > 0.0)
                .unwrap_or(defaults.default_risk_tolerance),
        }
    }
}

/// Constraint set with every default applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedConstraints {
    pub max_single_allocation_bps: u32,
    pub min_diversification: usize,
    pub risk_tolerance: f64,
}

impl Default for ResolvedConstraints {
    fn default() -> Self {
        Constraints::default().resolve(&ConstraintDefaults::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_falls_back_to_rl() {
        assert_eq!(AllocationModel::parse_or_default("kelly"), AllocationModel::Rl);
        assert_eq!(
            AllocationModel::parse_or_default("Markowitz"),
            AllocationModel::Markowitz
        );
        let m: AllocationModel = serde_json::from_str("\"ppo\"").unwrap();
        assert_eq!(m, AllocationModel::Rl);
    }

    #[test]
    fn zero_overrides_use_defaults() {
        let c = Constraints {
            max_single_allocation: Some(0),
            min_diversification: Some(3),
            risk_tolerance: None,
        };
        let r = c.resolve(&ConstraintDefaults::default());
        assert_eq!(r.max_single_allocation_bps, 7000);
        assert_eq!(r.min_diversification, 3);
        assert_eq!(r.risk_tolerance, 50.0);
    }

    #[test]
    fn constraints_accept_both_spellings() {
        let c: Constraints =
            serde_json::from_str(r#"{"maxSingleAllocation": 6000, "min_diversification": 3}"#)
                .unwrap();
        assert_eq!(c.max_single_allocation, Some(6000));
        assert_eq!(c.min_diversification, Some(3));
    }

    #[test]
    fn bps_lookup_defaults_to_zero() {
        let plan = AllocationPlan {
            legs: vec![Leg::new(Protocol::Staking, 10_000)],
            total_bps: 10_000,
            confidence: 50,
            model: AllocationModel::Markowitz,
        };
        assert_eq!(plan.bps_of(Protocol::Staking), 10_000);
        assert_eq!(plan.bps_of(Protocol::Lending), 0);
        assert_eq!(plan.total_bps, TOTAL_BPS);
    }
}
