use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RebalancerError;

/// Risk score used for protocols without a fixed entry in the risk table
pub const DEFAULT_PROTOCOL_RISK: f64 = 50.0;

/// Yield venues a vault can allocate capital to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Native staking
    Staking,
    /// Money-market lending
    Lending,
    /// AMM liquidity provision
    #[serde(rename = "LP", alias = "LiquidityProvision")]
    LiquidityProvision,
    /// Delta-neutral perpetuals hedge
    #[serde(rename = "PerpsHedge", alias = "PerpetualsHedge")]
    PerpsHedge,
}

impl Protocol {
    /// Canonical ordering, also the order in which unused protocols are
    /// picked up for diversification
    pub const ALL: [Protocol; 4] = [
        Protocol::Staking,
        Protocol::Lending,
        Protocol::LiquidityProvision,
        Protocol::PerpsHedge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Staking => "Staking",
            Protocol::Lending => "Lending",
            Protocol::LiquidityProvision => "LP",
            Protocol::PerpsHedge => "PerpsHedge",
        }
    }

    /// Fixed risk score (0-100) of the venue
    pub fn risk_score(&self) -> f64 {
        match self {
            Protocol::Staking => 20.0,
            Protocol::Lending => 35.0,
            Protocol::LiquidityProvision => 55.0,
            Protocol::PerpsHedge => 70.0,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = RebalancerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Staking" => Ok(Protocol::Staking),
            "Lending" => Ok(Protocol::Lending),
            "LP" | "LiquidityProvision" => Ok(Protocol::LiquidityProvision),
            "PerpsHedge" | "PerpetualsHedge" => Ok(Protocol::PerpsHedge),
            other => Err(RebalancerError::Validation(format!(
                "unknown protocol: {}",
                other
            ))),
        }
    }
}
