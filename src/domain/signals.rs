//! Market signals consumed by the allocation strategies

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::protocol::Protocol;
use crate::error::{RebalancerError, Result};

/// Volatility assumed for protocols missing from the volatility map
pub const DEFAULT_VOLATILITY: f64 = 0.20;

/// Snapshot of market state per protocol. Immutable for one optimization call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    /// Protocol or asset → current price (informational)
    pub prices: HashMap<String, f64>,
    /// Protocol → fractional APR (0.12 = 12%)
    pub apr: BTreeMap<Protocol, f64>,
    /// Portfolio-level risk score, 0-100
    pub risk: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility: Option<BTreeMap<Protocol, f64>>,
    /// Protocol → liquidity score (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidity: Option<BTreeMap<Protocol, f64>>,
}

impl Signals {
    pub fn new(risk: f64) -> Self {
        Self {
            prices: HashMap::new(),
            apr: BTreeMap::new(),
            risk,
            volatility: None,
            liquidity: None,
        }
    }

    pub fn with_apr(mut self, proto: Protocol, apr: f64) -> Self {
        self.apr.insert(proto, apr);
        self
    }

    pub fn with_volatility(mut self, proto: Protocol, vol: f64) -> Self {
        self.volatility
            .get_or_insert_with(BTreeMap::new)
            .insert(proto, vol);
        self
    }

    /// Parse and validate a JSON payload. Shape errors surface as validation failures.
    pub fn from_json(raw: &str) -> Result<Self> {
        let signals: Signals = serde_json::from_str(raw)
            .map_err(|e| RebalancerError::Validation(format!("invalid signals: {}", e)))?;
        signals.validate()?;
        Ok(signals)
    }

    pub fn volatility_of(&self, proto: Protocol) -> f64 {
        self.volatility
            .as_ref()
            .and_then(|v| v.get(&proto).copied())
            .unwrap_or(DEFAULT_VOLATILITY)
    }

    pub fn apr_of(&self, proto: Protocol) -> f64 {
        self.apr.get(&proto).copied().unwrap_or(0.0)
    }

    /// Protocols with a strictly positive APR, in canonical order
    pub fn eligible_protocols(&self) -> impl Iterator<Item = Protocol> + '_ {
        self.apr
            .iter()
            .filter(|(_, apr)| **apr > 0.0)
            .map(|(proto, _)| *proto)
    }

    /// Protocol with the highest raw APR. Ties keep the earliest protocol.
    pub fn best_apr_protocol(&self) -> Option<Protocol> {
        let mut best: Option<(Protocol, f64)> = None;
        for (proto, apr) in &self.apr {
            match best {
                Some((_, best_apr)) if *apr <= best_apr => {}
                _ => best = Some((*proto, *apr)),
            }
        }
        best.map(|(proto, _)| proto)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.risk.is_finite() || !(0.0..=100.0).contains(&self.risk) {
            return Err(RebalancerError::Validation(format!(
                "risk must be within 0-100: {}",
                self.risk
            )));
        }

        for (proto, apr) in &self.apr {
            if !apr.is_finite() {
                return Err(RebalancerError::Validation(format!(
                    "apr for {} is not a finite number",
                    proto
                )));
            }
        }

        if let Some(vol) = &self.volatility {
            for (proto, v) in vol {
                if !v.is_finite() || *v < 0.0 {
                    return Err(RebalancerError::Validation(format!(
                        "volatility for {} must be a non-negative number: {}",
                        proto, v
                    )));
                }
            }
        }

        for (key, price) in &self.prices {
            if !price.is_finite() {
                return Err(RebalancerError::Validation(format!(
                    "price for {} is not a finite number",
                    key
                )));
            }
        }

        Ok(())
    }
}
