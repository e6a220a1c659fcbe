//! The period-stepping simulation engine.
//!
//! [`Simulator::run`] walks the weight schedule in chronological order,
//! marking the portfolio to market, sizing capital through the
//! [`CapitalPolicy`], delegating trade computation to the allocation engine,
//! applying funding and commission, and appending one fully computed period
//! at a time to the output [`Ledger`]. Periods are strictly sequential:
//! period i starts from period i-1's ending portfolio.

use crate::allocation::{allocate, AllocationParams, OverridePrecedence};
use crate::capital::CapitalPolicy;
use crate::commission::CommissionModel;
use crate::error::{Result, SimError};
use crate::execution::SlippageBasis;
use crate::types::{Ledger, Panel, PeriodRecord, CASH};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How trades are sized into discrete increments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum LotSizing {
    /// Whole shares: the lot is the asset's mark price in quote terms.
    #[default]
    WholeShares,
    /// Fractional sizing at unit-quote granularity.
    Continuous,
    /// Caller-supplied per-asset lot sizes in quote currency.
    Custom(Vec<f64>),
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Capital seeded into cash at period 0.
    pub initial_capital: f64,
    /// No-trade half-width around target weights, in weight units.
    pub trade_buffer: f64,
    /// New positions bypass the trade buffer.
    pub ignore_buffer_on_new: bool,
    /// Zero-target positions liquidate in full regardless of the buffer.
    pub force_liquidate_on_zero: bool,
    /// Application order of the two buffer overrides.
    pub override_precedence: OverridePrecedence,
    /// Trade discretization mode.
    pub lot_sizing: LotSizing,
    /// Scale on negative adjusted target weights, 0 < f <= 1.
    pub short_factor: f64,
    /// Slippage fraction applied to the execution price.
    pub slippage_pct: f64,
    /// Bid/ask spread fraction, applied symmetrically around mid.
    pub spread_pct: f64,
    /// Sign source for the slippage direction.
    pub slippage_basis: SlippageBasis,
    /// Pay funding on absolute rather than signed exposure.
    pub funding_on_abs_position: bool,
    /// Starting quantities per asset with cash last; `None` seeds the whole
    /// initial capital into cash.
    pub starting_portfolio: Option<Vec<f64>>,
    /// Show a progress bar while stepping periods.
    pub show_progress: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_capital: 1000.0,
            trade_buffer: 0.0,
            ignore_buffer_on_new: false,
            force_liquidate_on_zero: false,
            override_precedence: OverridePrecedence::default(),
            lot_sizing: LotSizing::default(),
            short_factor: 1.0,
            slippage_pct: 0.0,
            spread_pct: 0.0,
            slippage_basis: SlippageBasis::default(),
            funding_on_abs_position: false,
            starting_portfolio: None,
            show_progress: false,
        }
    }
}

/// Results from a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimResult {
    /// Configuration used.
    pub config: SimConfig,
    /// Universe symbols, cash last.
    pub symbols: Vec<String>,
    /// Initial capital.
    pub initial_capital: f64,
    /// Mark-to-market total after the last processed period.
    pub final_equity: f64,
    /// Periods actually processed.
    pub periods_processed: usize,
    /// Periods in the input schedule.
    pub total_periods: usize,
    /// True when the run stopped early on insolvency.
    pub terminated_early: bool,
    /// The full per-asset-per-period ledger.
    pub ledger: Ledger,
    /// First period timestamp.
    pub start_time: DateTime<Utc>,
    /// Last period timestamp in the input schedule.
    pub end_time: DateTime<Utc>,
    /// Unique run identifier for bookkeeping.
    #[serde(default = "Uuid::new_v4")]
    pub experiment_id: Uuid,
}

impl SimResult {
    /// Serialize the result, ledger included, to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// The simulation engine.
pub struct Simulator {
    config: SimConfig,
}

impl Simulator {
    /// Create a new simulator.
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(SimConfig::default())
    }

    /// The active configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Run the simulation across all periods.
    ///
    /// `prices` and `weights` must be identically shaped; `funding`, if
    /// given, must match the same shape and defaults to all zeros. Shape or
    /// configuration violations are fatal; insolvency mid-run is a normal
    /// termination with all prior periods retained.
    pub fn run(
        &self,
        prices: &Panel,
        weights: &Panel,
        funding: Option<&Panel>,
        commission: &dyn CommissionModel,
        capital_policy: &dyn CapitalPolicy,
    ) -> Result<SimResult> {
        self.validate(prices, weights, funding)?;

        let n = prices.num_assets();
        let periods = prices.num_periods();
        let lot_sizes = self.resolve_lot_sizes(n)?;

        let mut symbols: Vec<String> = prices.symbols().to_vec();
        symbols.push(CASH.to_string());

        info!(
            "Running simulation: {} assets, {} periods, capital {:.2}",
            n, periods, self.config.initial_capital
        );

        // Portfolio state: base-unit quantities per asset plus the cash
        // balance. Single writer, committed once per period.
        let (mut quantities, mut cash) = match &self.config.starting_portfolio {
            Some(seed) => (seed[..n].to_vec(), seed[n]),
            None => (vec![0.0; n], self.config.initial_capital),
        };

        let progress = if self.config.show_progress {
            let pb = ProgressBar::new(periods as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let params = AllocationParams {
            trade_buffer: self.config.trade_buffer,
            ignore_buffer_on_new: self.config.ignore_buffer_on_new,
            force_liquidate_on_zero: self.config.force_liquidate_on_zero,
            short_factor: self.config.short_factor,
            lot_sizes: lot_sizes.as_deref(),
            precedence: self.config.override_precedence,
            slippage_pct: self.config.slippage_pct,
            spread_pct: self.config.spread_pct,
            slippage_basis: self.config.slippage_basis,
        };

        let mut ledger = Ledger::new(symbols.clone());
        let mut terminated_early = false;
        let mut final_equity = cash;

        for i in 0..periods {
            let price_row = prices.row(i);
            let target_row = weights.row(i);

            // Mark the carried portfolio to market.
            let equity: Vec<f64> = (0..n).map(|j| quantities[j] * price_row[j]).collect();
            let total = equity.iter().sum::<f64>() + cash;

            if total <= 0.0 {
                info!(
                    "Insolvent at period {} (total {:.2}), stopping; {} periods retained",
                    i, total, i
                );
                final_equity = total;
                terminated_early = true;
                break;
            }

            let capital = capital_policy.capital(self.config.initial_capital, total);

            let alloc = allocate(capital, price_row, &equity, target_row, &params);

            let funding_row = funding.map(|f| f.row(i));
            let mut records = Vec::with_capacity(n + 1);
            let mut traded_count = 0usize;
            let mut value_sum = 0.0;
            let mut commission_sum = 0.0;
            let mut funding_sum = 0.0;

            for j in 0..n {
                let rate = funding_row.map_or(0.0, |r| r[j]);
                let exposure = if self.config.funding_on_abs_position {
                    equity[j].abs()
                } else {
                    equity[j]
                };
                let funding_payment = exposure * rate;

                let quantity = alloc.trade_quantity[j];
                let value = alloc.trade_value[j];
                let fee = commission.commission(quantity, value);
                let traded = quantity.abs() > 0.0;
                if traded {
                    traded_count += 1;
                }

                value_sum += value;
                commission_sum += fee;
                funding_sum += funding_payment;

                records.push(PeriodRecord {
                    symbol: symbols[j].clone(),
                    price: price_row[j],
                    funding_rate: rate,
                    start_quantity: quantities[j],
                    equity: equity[j],
                    start_weight: alloc.start_weights[j],
                    target_weight: target_row[j],
                    adj_target_weight: alloc.adj_target_weights[j],
                    adj_delta_weight: alloc.adj_delta_weights[j],
                    traded,
                    trade_value: value,
                    trade_quantity: quantity,
                    funding_payment,
                    commission: fee,
                    end_quantity: quantities[j] + quantity,
                });
            }

            let end_cash = cash - value_sum + commission_sum + funding_sum;

            // Cash is never independently traded: its trade, commission and
            // funding fields stay zero, and it absorbs the residuals above.
            let mut cash_record = PeriodRecord::empty(CASH);
            cash_record.price = 1.0;
            cash_record.start_quantity = cash;
            cash_record.equity = cash;
            cash_record.end_quantity = end_cash;
            records.push(cash_record);

            debug!(
                "Period {}: total {:.2}, capital {:.2}, {} trades",
                i, total, capital, traded_count
            );

            ledger.push_period(records);

            // Commit the new portfolio state.
            for j in 0..n {
                quantities[j] += alloc.trade_quantity[j];
            }
            cash = end_cash;
            final_equity = (0..n).map(|j| quantities[j] * price_row[j]).sum::<f64>() + cash;

            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_with_message("Simulation complete");
        }

        let periods_processed = ledger.num_periods();
        info!(
            "Simulation complete: {}/{} periods, final equity {:.2}",
            periods_processed, periods, final_equity
        );

        Ok(SimResult {
            config: self.config.clone(),
            symbols,
            initial_capital: self.config.initial_capital,
            final_equity,
            periods_processed,
            total_periods: periods,
            terminated_early,
            ledger,
            start_time: prices.timestamps()[0],
            end_time: *prices.timestamps().last().unwrap(),
            experiment_id: Uuid::new_v4(),
        })
    }

    /// Run many configurations over the same schedule in parallel.
    ///
    /// Runs are independent, so cross-config parallelism is safe; within a
    /// run periods stay strictly sequential. Progress bars are disabled per
    /// run. Failed runs are logged and skipped.
    pub fn sweep<C, P>(
        prices: &Panel,
        weights: &Panel,
        funding: Option<&Panel>,
        configs: Vec<SimConfig>,
        commission: &C,
        capital_policy: &P,
    ) -> Vec<(SimConfig, SimResult)>
    where
        C: CommissionModel,
        P: CapitalPolicy,
    {
        configs
            .into_par_iter()
            .filter_map(|mut config| {
                config.show_progress = false;
                let sim = Simulator::new(config.clone());
                match sim.run(prices, weights, funding, commission, capital_policy) {
                    Ok(result) => Some((config, result)),
                    Err(e) => {
                        warn!("Sweep run failed: {}", e);
                        None
                    }
                }
            })
            .collect()
    }

    fn validate(&self, prices: &Panel, weights: &Panel, funding: Option<&Panel>) -> Result<()> {
        if !prices.same_shape(weights) {
            return Err(SimError::ShapeMismatch(
                "prices and weights must share symbols and timestamps".to_string(),
            ));
        }
        if let Some(f) = funding {
            if !f.same_shape(prices) {
                return Err(SimError::ShapeMismatch(
                    "funding rates must match the shape of prices".to_string(),
                ));
            }
        }
        if prices.symbols().iter().any(|s| s == CASH) {
            return Err(SimError::InvalidInput(format!(
                "'{}' is reserved for the cash balance",
                CASH
            )));
        }

        let c = &self.config;
        if c.initial_capital <= 0.0 {
            return Err(SimError::ConfigError(
                "initial_capital must be positive".to_string(),
            ));
        }
        if c.trade_buffer < 0.0 {
            return Err(SimError::ConfigError(
                "trade_buffer must be non-negative".to_string(),
            ));
        }
        if !(c.short_factor > 0.0 && c.short_factor <= 1.0) {
            return Err(SimError::ConfigError(
                "short_factor must be in (0, 1]".to_string(),
            ));
        }
        if c.slippage_pct < 0.0 || c.spread_pct < 0.0 {
            return Err(SimError::ConfigError(
                "slippage_pct and spread_pct must be non-negative".to_string(),
            ));
        }
        if let Some(seed) = &c.starting_portfolio {
            if seed.len() != prices.num_assets() + 1 {
                return Err(SimError::ConfigError(format!(
                    "starting_portfolio needs {} entries (assets plus cash), got {}",
                    prices.num_assets() + 1,
                    seed.len()
                )));
            }
            if seed.iter().any(|q| !q.is_finite()) {
                return Err(SimError::ConfigError(
                    "starting_portfolio must be finite".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn resolve_lot_sizes(&self, n: usize) -> Result<Option<Vec<f64>>> {
        match &self.config.lot_sizing {
            LotSizing::WholeShares => Ok(None),
            LotSizing::Continuous => Ok(Some(vec![1.0; n])),
            LotSizing::Custom(lots) => {
                if lots.len() != n {
                    return Err(SimError::ConfigError(format!(
                        "lot size vector has {} entries for {} assets",
                        lots.len(),
                        n
                    )));
                }
                if lots.iter().any(|l| !l.is_finite() || *l <= 0.0) {
                    return Err(SimError::ConfigError(
                        "lot sizes must be positive and finite".to_string(),
                    ));
                }
                Ok(Some(lots.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capital::{FixedStake, FullReinvestment};
    use crate::commission::ZeroCommission;

    fn single_asset(prices: Vec<f64>, weights: Vec<f64>) -> (Panel, Panel) {
        let p = Panel::from_rows(
            vec!["ACME".to_string()],
            prices.into_iter().map(|v| vec![v]).collect(),
        )
        .unwrap();
        let w = Panel::from_rows(
            vec!["ACME".to_string()],
            weights.into_iter().map(|v| vec![v]).collect(),
        )
        .unwrap();
        (p, w)
    }

    #[test]
    fn test_simulator_creation() {
        let sim = Simulator::with_defaults();
        assert_eq!(sim.config().initial_capital, 1000.0);
    }

    #[test]
    fn test_shape_mismatch_is_fatal() {
        let (prices, _) = single_asset(vec![10.0, 15.0], vec![1.0, 1.0]);
        let weights = Panel::from_rows(
            vec!["OTHER".to_string()],
            vec![vec![1.0], vec![1.0]],
        )
        .unwrap();

        let sim = Simulator::with_defaults();
        let err = sim
            .run(&prices, &weights, None, &ZeroCommission, &FixedStake)
            .unwrap_err();
        assert!(matches!(err, SimError::ShapeMismatch(_)));
    }

    #[test]
    fn test_cash_symbol_reserved() {
        let prices =
            Panel::from_rows(vec![CASH.to_string()], vec![vec![1.0]]).unwrap();
        let weights = prices.clone();
        let sim = Simulator::with_defaults();
        let err = sim
            .run(&prices, &weights, None, &ZeroCommission, &FixedStake)
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidInput(_)));
    }

    #[test]
    fn test_config_validation() {
        let (prices, weights) = single_asset(vec![10.0], vec![1.0]);

        let bad = SimConfig {
            short_factor: 0.0,
            ..Default::default()
        };
        let err = Simulator::new(bad)
            .run(&prices, &weights, None, &ZeroCommission, &FixedStake)
            .unwrap_err();
        assert!(matches!(err, SimError::ConfigError(_)));

        let bad = SimConfig {
            initial_capital: 0.0,
            ..Default::default()
        };
        assert!(Simulator::new(bad)
            .run(&prices, &weights, None, &ZeroCommission, &FixedStake)
            .is_err());
    }

    #[test]
    fn test_state_threading_across_periods() {
        let (prices, weights) = single_asset(vec![10.0, 15.0, 30.0], vec![1.0, 1.0, 0.0]);
        let sim = Simulator::with_defaults();
        let result = sim
            .run(&prices, &weights, None, &ZeroCommission, &FullReinvestment)
            .unwrap();

        // Start of period i equals end of period i-1, cash included
        for i in 1..result.periods_processed {
            for symbol in result.symbols.clone() {
                let prev = result.ledger.get(i - 1, &symbol).unwrap();
                let curr = result.ledger.get(i, &symbol).unwrap();
                assert_eq!(prev.end_quantity, curr.start_quantity, "{symbol} @ {i}");
            }
        }
    }

    #[test]
    fn test_zero_price_period_is_well_formed() {
        // Price of zero: marking yields zero equity, trades are neutralized
        // rather than producing non-finite values.
        let (prices, weights) = single_asset(vec![0.0, 0.0], vec![1.0, 1.0]);
        let sim = Simulator::with_defaults();
        let result = sim
            .run(&prices, &weights, None, &ZeroCommission, &FixedStake)
            .unwrap();

        assert_eq!(result.periods_processed, 2);
        for record in result.ledger.iter() {
            assert!(record.trade_quantity == 0.0);
            assert!(record.trade_value.is_finite());
            assert!(record.start_weight.is_finite());
        }
    }

    #[test]
    fn test_custom_lot_size_validation() {
        let (prices, weights) = single_asset(vec![10.0], vec![1.0]);
        let bad = SimConfig {
            lot_sizing: LotSizing::Custom(vec![10.0, 20.0]),
            ..Default::default()
        };
        let err = Simulator::new(bad)
            .run(&prices, &weights, None, &ZeroCommission, &FixedStake)
            .unwrap_err();
        assert!(matches!(err, SimError::ConfigError(_)));
    }

    #[test]
    fn test_sweep_runs_all_configs() {
        let (prices, weights) = single_asset(vec![10.0, 15.0, 30.0], vec![1.0, 1.0, 0.0]);
        let configs: Vec<SimConfig> = [0.0, 0.1, 0.25]
            .iter()
            .map(|&buffer| SimConfig {
                trade_buffer: buffer,
                ..Default::default()
            })
            .collect();

        let results = Simulator::sweep(
            &prices,
            &weights,
            None,
            configs,
            &ZeroCommission,
            &FullReinvestment,
        );
        assert_eq!(results.len(), 3);
        for (config, result) in &results {
            assert_eq!(result.config.trade_buffer, config.trade_buffer);
            assert_eq!(result.periods_processed, 3);
        }
    }

    #[test]
    fn test_result_serializes() {
        let (prices, weights) = single_asset(vec![10.0], vec![1.0]);
        let sim = Simulator::with_defaults();
        let result = sim
            .run(&prices, &weights, None, &ZeroCommission, &FixedStake)
            .unwrap();
        let json = result.to_json().unwrap();
        assert!(json.contains("\"final_equity\""));
    }
}
