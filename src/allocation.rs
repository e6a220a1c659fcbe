//! The allocation engine: buffered targets, short-side scaling, and lot
//! discretization.
//!
//! [`allocate`] is a pure function over the non-cash asset slice of a single
//! period. It holds no state across calls, so identical inputs always produce
//! identical outputs; the simulation loop owns all evolving state.

use crate::execution::{execution_price, SlippageBasis};
use serde::{Deserialize, Serialize};

/// Application order for the two buffer-override flags.
///
/// The two override conditions are mutually exclusive per asset (one requires
/// a zero starting weight, the other a nonzero one), but the precedence is
/// kept explicit and selectable because observed variants differ on it. The
/// later override wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverridePrecedence {
    /// Apply ignore-buffer-on-new first, then force-liquidate-on-zero.
    #[default]
    NewThenLiquidate,
    /// Apply force-liquidate-on-zero first, then ignore-buffer-on-new.
    LiquidateThenNew,
}

/// Per-call parameters for [`allocate`].
#[derive(Debug, Clone)]
pub struct AllocationParams<'a> {
    /// No-trade half-width around the target weight, in weight units.
    pub trade_buffer: f64,
    /// New positions (zero start weight, nonzero target) bypass the buffer.
    pub ignore_buffer_on_new: bool,
    /// A zero target closes an open position in full, buffer notwithstanding.
    pub force_liquidate_on_zero: bool,
    /// Scale applied to negative adjusted targets, 0 < f <= 1.
    pub short_factor: f64,
    /// Per-asset lot sizes in quote currency. `None` means whole-share
    /// granularity: the lot is the asset's mark price.
    pub lot_sizes: Option<&'a [f64]>,
    pub precedence: OverridePrecedence,
    pub slippage_pct: f64,
    pub spread_pct: f64,
    pub slippage_basis: SlippageBasis,
}

impl Default for AllocationParams<'_> {
    fn default() -> Self {
        Self {
            trade_buffer: 0.0,
            ignore_buffer_on_new: false,
            force_liquidate_on_zero: false,
            short_factor: 1.0,
            lot_sizes: None,
            precedence: OverridePrecedence::default(),
            slippage_pct: 0.0,
            spread_pct: 0.0,
            slippage_basis: SlippageBasis::default(),
        }
    }
}

/// Output of [`allocate`], one entry per asset in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub start_weights: Vec<f64>,
    pub adj_target_weights: Vec<f64>,
    pub adj_delta_weights: Vec<f64>,
    /// Realized trade size in base units.
    pub trade_quantity: Vec<f64>,
    /// Realized trade size in quote currency, an exact lot multiple.
    pub trade_value: Vec<f64>,
}

/// Compute the discretized trades that move a marked portfolio toward its
/// target weights.
///
/// Per asset: start weight from equity and capital, buffer clamp to the
/// no-trade zone, optional overrides for new and closing positions, short
/// factor on negative adjusted targets, then discretization of the nominal
/// quote amount into lots priced at the slippage-adjusted execution price.
/// Divisions through zero or non-finite prices resolve to a zero trade.
pub fn allocate(
    capital: f64,
    prices: &[f64],
    equity: &[f64],
    target_weights: &[f64],
    params: &AllocationParams,
) -> Allocation {
    let n = prices.len();
    debug_assert_eq!(equity.len(), n);
    debug_assert_eq!(target_weights.len(), n);

    let mut start_weights = Vec::with_capacity(n);
    let mut adj_target_weights = Vec::with_capacity(n);
    let mut adj_delta_weights = Vec::with_capacity(n);
    let mut trade_quantity = Vec::with_capacity(n);
    let mut trade_value = Vec::with_capacity(n);

    for j in 0..n {
        let target = target_weights[j];
        let start = finite_or_zero(equity[j] / capital);

        let mut adj = buffered_target(target, start, params.trade_buffer);
        adj = apply_overrides(adj, target, start, params);
        if adj < 0.0 {
            adj *= params.short_factor;
        }

        let delta = adj - start;
        let nominal_value = delta * capital;

        let direction = match params.slippage_basis {
            SlippageBasis::TradeDelta => delta,
            SlippageBasis::TargetWeight => target,
        };
        let exec_price = execution_price(
            prices[j],
            direction,
            params.slippage_pct,
            params.spread_pct,
        );

        let lot = params.lot_sizes.map(|l| l[j]).unwrap_or(prices[j]);
        let (value, quantity) = discretize(nominal_value, lot, exec_price);

        start_weights.push(start);
        adj_target_weights.push(adj);
        adj_delta_weights.push(delta);
        trade_quantity.push(quantity);
        trade_value.push(value);
    }

    Allocation {
        start_weights,
        adj_target_weights,
        adj_delta_weights,
        trade_quantity,
        trade_value,
    }
}

/// Clamp the starting weight into the no-trade zone around the target.
///
/// Inside `[target - buffer, target + buffer]` the adjusted target equals the
/// starting weight, so the delta is zero and no trade occurs. Outside, the
/// portfolio trades only to the nearest zone edge, which minimizes turnover.
fn buffered_target(target: f64, current: f64, buffer: f64) -> f64 {
    if current < target - buffer {
        target - buffer
    } else if current > target + buffer {
        target + buffer
    } else {
        current
    }
}

fn apply_overrides(adj: f64, target: f64, start: f64, params: &AllocationParams) -> f64 {
    let mut adj = adj;
    let apply_new = |adj: f64| {
        if params.ignore_buffer_on_new && start == 0.0 && target.abs() > 0.0 {
            target
        } else {
            adj
        }
    };
    let apply_liquidate = |adj: f64| {
        if params.force_liquidate_on_zero && target == 0.0 && start.abs() > 0.0 {
            0.0
        } else {
            adj
        }
    };

    match params.precedence {
        OverridePrecedence::NewThenLiquidate => {
            adj = apply_new(adj);
            adj = apply_liquidate(adj);
        }
        OverridePrecedence::LiquidateThenNew => {
            adj = apply_liquidate(adj);
            adj = apply_new(adj);
        }
    }
    adj
}

/// Round a nominal quote amount to an executable (value, quantity) pair.
///
/// The budget is rounded to the nearest quote unit, then truncated toward
/// zero to the nearest lot multiple: partial lots are dropped, never
/// executed, on both the buy and the sell side. Non-finite intermediate
/// results (zero price, zero lot) resolve to a zero trade.
fn discretize(nominal_value: f64, lot: f64, exec_price: f64) -> (f64, f64) {
    let budget = nominal_value.round();
    if !budget.is_finite() || !lot.is_finite() || lot <= 0.0 {
        return (0.0, 0.0);
    }

    let lots = (budget / lot).trunc();
    let value = lots * lot;
    let quantity = value / exec_price;
    if !quantity.is_finite() || !value.is_finite() {
        return (0.0, 0.0);
    }

    (value, quantity)
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}
