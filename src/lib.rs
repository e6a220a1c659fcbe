//! Allocsim - a deterministic target-weight portfolio simulator.
//!
//! # Overview
//!
//! Allocsim steps a multi-asset portfolio through a schedule of target
//! weights against a price history, producing a complete per-asset
//! per-period ledger of marks, trades, costs and resulting positions:
//!
//! - **Buffered rebalancing**: a configurable no-trade zone around each
//!   target weight keeps turnover down
//! - **Lot discretization**: trades are sized into whole shares, fractional
//!   units, or custom quote-currency lots
//! - **Realistic costs**: slippage, bid/ask spread, pluggable commission
//!   models, and funding payments on signed or absolute exposure
//! - **Pluggable capital sizing**: fixed stake, full reinvestment, or
//!   square-root partial reinvestment
//! - **Deterministic and auditable**: identical inputs always produce
//!   identical ledgers, period by period
//!
//! # Quick Start
//!
//! ```
//! use allocsim::{
//!     capital::FullReinvestment,
//!     commission::ZeroCommission,
//!     engine::{SimConfig, Simulator},
//!     types::Panel,
//! };
//!
//! let prices = Panel::from_rows(
//!     vec!["ACME".to_string()],
//!     vec![vec![10.0], vec![15.0], vec![30.0]],
//! )
//! .unwrap();
//! let weights = Panel::from_rows(
//!     vec!["ACME".to_string()],
//!     vec![vec![1.0], vec![1.0], vec![0.0]],
//! )
//! .unwrap();
//!
//! let sim = Simulator::new(SimConfig {
//!     initial_capital: 1000.0,
//!     ..Default::default()
//! });
//! let result = sim
//!     .run(&prices, &weights, None, &ZeroCommission, &FullReinvestment)
//!     .unwrap();
//!
//! println!("final equity: {:.2}", result.final_equity);
//! ```
//!
//! # Modules
//!
//! - [`types`]: input panels and the output ledger
//! - [`engine`]: the period-stepping simulation loop
//! - [`allocation`]: the buffered, discretized allocation engine
//! - [`execution`]: slippage and spread price adjustments
//! - [`commission`]: pluggable commission models
//! - [`capital`]: pluggable capital sizing policies
//! - [`forecast`]: forecast normalization and capped redistribution
//! - [`config`]: TOML configuration file support

pub mod allocation;
pub mod capital;
pub mod commission;
pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod forecast;
pub mod types;

// Re-exports for convenience
pub use allocation::{allocate, Allocation, AllocationParams, OverridePrecedence};
pub use capital::{CapitalPolicy, FixedStake, FullReinvestment, SqrtProfit};
pub use commission::{
    CommissionModel, FixedCommission, LinearPctCommission, TieredPctCommission, ZeroCommission,
};
pub use config::SimFileConfig;
pub use engine::{LotSizing, SimConfig, SimResult, Simulator};
pub use error::{Result, SimError};
pub use execution::{execution_price, SlippageBasis};
pub use forecast::{distribute, distribute_longshort, to_weights};
pub use types::{Ledger, Panel, PeriodRecord, CASH};
