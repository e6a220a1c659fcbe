//! Configuration file support for simulation runs.
//!
//! Allows loading run configurations from TOML files for reproducibility.

use crate::capital::{CapitalPolicy, FixedStake, FullReinvestment, SqrtProfit};
use crate::commission::{
    CommissionModel, FixedCommission, LinearPctCommission, TieredPctCommission, ZeroCommission,
};
use crate::engine::{LotSizing, SimConfig};
use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Complete simulation configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimFileConfig {
    /// Engine settings.
    #[serde(default)]
    pub simulation: SimulationSettings,
    /// Commission model settings.
    #[serde(default)]
    pub costs: CostSettings,
    /// Capital sizing settings.
    #[serde(default)]
    pub capital: CapitalSettings,
}

/// Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Initial capital.
    #[serde(default = "default_capital")]
    pub initial_capital: f64,
    /// No-trade half-width in weight units.
    #[serde(default)]
    pub trade_buffer: f64,
    /// New positions bypass the buffer.
    #[serde(default)]
    pub ignore_buffer_on_new: bool,
    /// Zero targets liquidate in full.
    #[serde(default)]
    pub force_liquidate_on_zero: bool,
    /// Sizing mode: "whole-shares" or "continuous".
    #[serde(default = "default_sizing")]
    pub sizing: String,
    /// Short-side weight scale, 0 < f <= 1.
    #[serde(default = "default_short_factor")]
    pub short_factor: f64,
    /// Slippage fraction.
    #[serde(default)]
    pub slippage_pct: f64,
    /// Bid/ask spread fraction.
    #[serde(default)]
    pub spread_pct: f64,
    /// Pay funding on absolute exposure.
    #[serde(default)]
    pub funding_on_abs_position: bool,
    /// Show a progress bar.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

fn default_capital() -> f64 { 1000.0 }
fn default_short_factor() -> f64 { 1.0 }
fn default_sizing() -> String { "whole-shares".to_string() }
fn default_true() -> bool { true }

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            initial_capital: 1000.0,
            trade_buffer: 0.0,
            ignore_buffer_on_new: false,
            force_liquidate_on_zero: false,
            sizing: "whole-shares".to_string(),
            short_factor: 1.0,
            slippage_pct: 0.0,
            spread_pct: 0.0,
            funding_on_abs_position: false,
            show_progress: true,
        }
    }
}

/// Commission model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSettings {
    /// Model: "zero", "fixed", "linear", or "tiered".
    #[serde(default = "default_cost_model")]
    pub model: String,
    /// Flat fee per trade (fixed model).
    #[serde(default)]
    pub fee_per_trade: f64,
    /// Commission fraction of trade value (linear model).
    #[serde(default)]
    pub pct_commission: f64,
    /// Minimum fee per order (tiered model).
    #[serde(default)]
    pub min_fee_per_order: f64,
    /// Fee per base unit (tiered model).
    #[serde(default)]
    pub fee_per_unit: f64,
    /// Percentage-of-value ceiling (tiered model).
    #[serde(default)]
    pub max_pct_per_order: f64,
}

fn default_cost_model() -> String { "zero".to_string() }

impl Default for CostSettings {
    fn default() -> Self {
        Self {
            model: "zero".to_string(),
            fee_per_trade: 0.0,
            pct_commission: 0.0,
            min_fee_per_order: 0.0,
            fee_per_unit: 0.0,
            max_pct_per_order: 0.0,
        }
    }
}

/// Capital sizing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalSettings {
    /// Policy: "fixed-stake", "reinvest", or "sqrt-profit".
    #[serde(default = "default_policy")]
    pub policy: String,
}

fn default_policy() -> String { "fixed-stake".to_string() }

impl Default for CapitalSettings {
    fn default() -> Self {
        Self {
            policy: "fixed-stake".to_string(),
        }
    }
}

impl SimFileConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path)?;
        let config: SimFileConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| SimError::ConfigError(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert to a [`SimConfig`] for the engine.
    pub fn to_sim_config(&self) -> Result<SimConfig> {
        let lot_sizing = match self.simulation.sizing.to_lowercase().as_str() {
            "whole-shares" => LotSizing::WholeShares,
            "continuous" => LotSizing::Continuous,
            other => {
                return Err(SimError::ConfigError(format!(
                    "unknown sizing mode: {}",
                    other
                )))
            }
        };

        Ok(SimConfig {
            initial_capital: self.simulation.initial_capital,
            trade_buffer: self.simulation.trade_buffer,
            ignore_buffer_on_new: self.simulation.ignore_buffer_on_new,
            force_liquidate_on_zero: self.simulation.force_liquidate_on_zero,
            lot_sizing,
            short_factor: self.simulation.short_factor,
            slippage_pct: self.simulation.slippage_pct,
            spread_pct: self.simulation.spread_pct,
            funding_on_abs_position: self.simulation.funding_on_abs_position,
            show_progress: self.simulation.show_progress,
            ..Default::default()
        })
    }

    /// Build the configured commission model.
    pub fn commission_model(&self) -> Result<Box<dyn CommissionModel>> {
        match self.costs.model.to_lowercase().as_str() {
            "zero" => Ok(Box::new(ZeroCommission)),
            "fixed" => Ok(Box::new(FixedCommission::new(self.costs.fee_per_trade))),
            "linear" => Ok(Box::new(LinearPctCommission::new(
                self.costs.pct_commission,
            ))),
            "tiered" => Ok(Box::new(TieredPctCommission {
                min_fee_per_order: self.costs.min_fee_per_order,
                fee_per_unit: self.costs.fee_per_unit,
                max_pct_per_order: self.costs.max_pct_per_order,
            })),
            other => Err(SimError::ConfigError(format!(
                "unknown commission model: {}",
                other
            ))),
        }
    }

    /// Build the configured capital sizing policy.
    pub fn capital_policy(&self) -> Result<Box<dyn CapitalPolicy>> {
        match self.capital.policy.to_lowercase().as_str() {
            "fixed-stake" => Ok(Box::new(FixedStake)),
            "reinvest" => Ok(Box::new(FullReinvestment)),
            "sqrt-profit" => Ok(Box::new(SqrtProfit)),
            other => Err(SimError::ConfigError(format!(
                "unknown capital policy: {}",
                other
            ))),
        }
    }

    /// Generate an example configuration file content.
    pub fn example() -> String {
        r#"# allocsim configuration file

[simulation]
initial_capital = 1000.0
trade_buffer = 0.1
ignore_buffer_on_new = false
force_liquidate_on_zero = false
sizing = "whole-shares"   # or "continuous"
short_factor = 1.0
slippage_pct = 0.0005
spread_pct = 0.0
funding_on_abs_position = false
show_progress = true

[costs]
model = "linear"          # "zero", "fixed", "linear", "tiered"
pct_commission = 0.001

# Tiered schedule example:
# model = "tiered"
# min_fee_per_order = 1.0
# fee_per_unit = 0.005
# max_pct_per_order = 0.01

[capital]
policy = "fixed-stake"    # "fixed-stake", "reinvest", "sqrt-profit"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = SimFileConfig::default();
        assert_eq!(config.simulation.initial_capital, 1000.0);
        assert_eq!(config.costs.model, "zero");
        assert_eq!(config.capital.policy, "fixed-stake");
    }

    #[test]
    fn test_load_config() {
        let toml_content = r#"
[simulation]
initial_capital = 5000.0
trade_buffer = 0.25
sizing = "continuous"
slippage_pct = 0.001

[costs]
model = "linear"
pct_commission = 0.002

[capital]
policy = "sqrt-profit"
"#;
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", toml_content).unwrap();

        let config = SimFileConfig::load(file.path()).unwrap();
        assert_eq!(config.simulation.initial_capital, 5000.0);
        assert_eq!(config.simulation.trade_buffer, 0.25);
        assert_eq!(config.simulation.sizing, "continuous");
        assert_eq!(config.costs.model, "linear");
        assert_eq!(config.capital.policy, "sqrt-profit");
    }

    #[test]
    fn test_to_sim_config() {
        let mut file_config = SimFileConfig::default();
        file_config.simulation.trade_buffer = 0.1;
        file_config.simulation.sizing = "continuous".to_string();

        let config = file_config.to_sim_config().unwrap();
        assert_eq!(config.trade_buffer, 0.1);
        assert_eq!(config.lot_sizing, LotSizing::Continuous);

        file_config.simulation.sizing = "bogus".to_string();
        assert!(file_config.to_sim_config().is_err());
    }

    #[test]
    fn test_model_builders() {
        let mut config = SimFileConfig::default();
        config.costs.model = "linear".to_string();
        config.costs.pct_commission = 0.1;

        let model = config.commission_model().unwrap();
        assert_eq!(model.commission(10.0, 500.0), -50.0);

        let policy = config.capital_policy().unwrap();
        assert_eq!(policy.capital(1000.0, 9999.0), 1000.0);

        config.costs.model = "bogus".to_string();
        assert!(config.commission_model().is_err());
    }

    #[test]
    fn test_save_roundtrip() {
        let config = SimFileConfig::default();
        let file = NamedTempFile::new().unwrap();
        config.save(file.path()).unwrap();

        let loaded = SimFileConfig::load(file.path()).unwrap();
        assert_eq!(
            loaded.simulation.initial_capital,
            config.simulation.initial_capital
        );
    }

    #[test]
    fn test_example_config_parses() {
        let example = SimFileConfig::example();
        let config: SimFileConfig = toml::from_str(&example).unwrap();
        assert_eq!(config.costs.model, "linear");
        assert!(config.simulation.trade_buffer > 0.0);
    }
}
