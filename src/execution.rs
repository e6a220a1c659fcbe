//! Execution price adjustments: slippage and bid/ask spread.

use serde::{Deserialize, Serialize};

/// Which sign determines the trade direction used for slippage.
///
/// Observed variants differ here, so the choice is a configuration-selectable
/// policy rather than a hardcoded rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlippageBasis {
    /// Direction from the sign of the buffer-adjusted delta weight.
    #[default]
    TradeDelta,
    /// Direction from the sign of the target weight.
    TargetWeight,
}

/// Derive the execution price from the mark price.
///
/// Buys pay `price * (1 + slippage + spread/2)`, sells receive
/// `price * (1 - slippage - spread/2)`; the spread is applied symmetrically
/// around the mid price. A zero direction leaves the price unchanged.
/// The adjusted price, not the raw mark, is used when converting a trade
/// value into a trade quantity.
pub fn execution_price(price: f64, direction: f64, slippage_pct: f64, spread_pct: f64) -> f64 {
    let adjustment = slippage_pct + spread_pct / 2.0;

    if direction > 0.0 {
        price * (1.0 + adjustment)
    } else if direction < 0.0 {
        price * (1.0 - adjustment)
    } else {
        price
    }
}
