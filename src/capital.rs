//! Capital sizing policies.
//!
//! A policy maps (initial capital, current mark-to-market total) to the
//! investable capital for the period. It is consulted once per period,
//! before allocation.

use serde::{Deserialize, Serialize};

/// Pluggable capital sizing.
pub trait CapitalPolicy: Send + Sync {
    fn capital(&self, initial: f64, total: f64) -> f64;
}

/// Initial stake only; profits are never reinvested.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FixedStake;

impl CapitalPolicy for FixedStake {
    fn capital(&self, initial: f64, _total: f64) -> f64 {
        initial
    }
}

/// All profits reinvested: capital equals the current total.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FullReinvestment;

impl CapitalPolicy for FullReinvestment {
    fn capital(&self, _initial: f64, total: f64) -> f64 {
        total
    }
}

/// Partial reinvestment scaled by the square root of the growth rate:
/// `initial * sqrt(1 + (total - initial) / initial)`.
///
/// Dampens position growth as equity compounds, which guards against
/// increasingly severe drawdowns at larger account sizes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SqrtProfit;

impl CapitalPolicy for SqrtProfit {
    fn capital(&self, initial: f64, total: f64) -> f64 {
        initial * (1.0 + (total - initial) / initial).sqrt()
    }
}
