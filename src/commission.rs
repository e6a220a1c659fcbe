//! Commission cost models.
//!
//! Commission is a collaborator interface: the engine calls the model once
//! per asset per period with the realized trade quantity and quote value.
//! Models return a signed cost (zero or negative) that is added to cash
//! alongside the trade value.

use serde::{Deserialize, Serialize};

/// Pluggable commission computation.
pub trait CommissionModel: Send + Sync {
    /// Commission for a single trade, as a signed cost (<= 0).
    ///
    /// Called with zero quantity and value for untraded assets; no model
    /// charges when no trade occurred.
    fn commission(&self, trade_quantity: f64, trade_value: f64) -> f64;
}

/// No commission.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ZeroCommission;

impl CommissionModel for ZeroCommission {
    fn commission(&self, _trade_quantity: f64, _trade_value: f64) -> f64 {
        0.0
    }
}

/// Flat fee per executed trade.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FixedCommission {
    pub fee_per_trade: f64,
}

impl FixedCommission {
    pub fn new(fee_per_trade: f64) -> Self {
        Self { fee_per_trade }
    }
}

impl CommissionModel for FixedCommission {
    fn commission(&self, trade_quantity: f64, _trade_value: f64) -> f64 {
        if trade_quantity == 0.0 {
            return 0.0;
        }
        -self.fee_per_trade
    }
}

/// Linear percentage of the absolute trade value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinearPctCommission {
    pub pct_commission: f64,
}

impl LinearPctCommission {
    pub fn new(pct_commission: f64) -> Self {
        Self { pct_commission }
    }
}

impl CommissionModel for LinearPctCommission {
    fn commission(&self, _trade_quantity: f64, trade_value: f64) -> f64 {
        -(trade_value.abs() * self.pct_commission)
    }
}

/// Tiered schedule: the lesser of a per-unit fee and a percentage of value,
/// floored by a minimum fee per order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TieredPctCommission {
    pub min_fee_per_order: f64,
    pub fee_per_unit: f64,
    pub max_pct_per_order: f64,
}

impl CommissionModel for TieredPctCommission {
    fn commission(&self, trade_quantity: f64, trade_value: f64) -> f64 {
        if trade_quantity == 0.0 {
            return 0.0;
        }
        let per_unit = trade_quantity.abs() * self.fee_per_unit;
        let pct_of_value = trade_value.abs() * self.max_pct_per_order;
        -per_unit.min(pct_of_value).max(self.min_fee_per_order)
    }
}
