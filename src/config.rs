use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::ConstraintDefaults;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub constraints: ConstraintDefaults,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub paper_vault: PaperVaultConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tunables of the allocation strategies
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModelsConfig {
    #[serde(default)]
    pub bandit: BanditParams,
    #[serde(default)]
    pub rl: RegimeParams,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BanditParams {
    /// Probability of leaving the baseline untouched (0.0-1.0)
    #[serde(default = "default_exploration_rate")]
    pub exploration_rate: f64,
}

fn default_exploration_rate() -> f64 {
    0.1
}

impl Default for BanditParams {
    fn default() -> Self {
        Self {
            exploration_rate: default_exploration_rate(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegimeParams {
    /// risk/100 above this → high-volatility regime
    #[serde(default = "default_high_vol_threshold")]
    pub high_vol_threshold: f64,
    /// risk/100 below this → low-volatility regime
    #[serde(default = "default_low_vol_threshold")]
    pub low_vol_threshold: f64,
}

fn default_high_vol_threshold() -> f64 {
    0.7
}
fn default_low_vol_threshold() -> f64 {
    0.3
}

impl Default for RegimeParams {
    fn default() -> Self {
        Self {
            high_vol_threshold: default_high_vol_threshold(),
            low_vol_threshold: default_low_vol_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// Minimum per-protocol drift (bps) that justifies executing a rebalance
    #[serde(default = "default_materiality_threshold")]
    pub materiality_threshold_bps: u32,
    /// Portfolio value used for projections when no vault is involved
    #[serde(default = "default_projection_value")]
    pub projection_value_usd: Decimal,
}

fn default_materiality_threshold() -> u32 {
    500
}
fn default_projection_value() -> Decimal {
    dec!(1000000)
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            materiality_threshold_bps: default_materiality_threshold(),
            projection_value_usd: default_projection_value(),
        }
    }
}

/// Seed values for the in-memory simulated vault
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaperVaultConfig {
    #[serde(default = "default_projection_value")]
    pub initial_value_usd: Decimal,
    /// Age of the seeded last rebalance, in hours
    #[serde(default = "default_last_rebalance_age")]
    pub last_rebalance_age_hours: i64,
}

fn default_last_rebalance_age() -> i64 {
    24
}

impl Default for PaperVaultConfig {
    fn default() -> Self {
        Self {
            initial_value_usd: default_projection_value(),
            last_rebalance_age_hours: default_last_rebalance_age(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for daily rotated log files (disabled when unset)
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("orchestrator.materiality_threshold_bps", 500)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("REBALANCER_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (REBALANCER__CONSTRAINTS__MIN_DIVERSIFICATION, etc.)
            .add_source(
                Environment::with_prefix("REBALANCER")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}
