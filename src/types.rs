//! Core data types: the period-by-asset input panel and the output ledger.

use crate::error::{Result, SimError};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Reserved synthetic identifier for the cash balance.
///
/// Cash always carries price 1 and target weight 0. It is appended to the
/// universe internally by the engine and must not appear as an input column.
pub const CASH: &str = "CASH";

/// A dense period-by-asset table of real values.
///
/// Rows are periods in strictly ascending timestamp order; columns are the
/// ordered asset symbols. Prices, target weights and funding rates are all
/// carried as panels of identical shape. Missing values (NaN) are rejected
/// at construction, so a panel that exists is always numerically complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    timestamps: Vec<DateTime<Utc>>,
    symbols: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl Panel {
    /// Create a panel with validation.
    ///
    /// Fails if the table is empty, ragged, contains NaN, or the timestamps
    /// are not strictly increasing.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        symbols: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if symbols.is_empty() {
            return Err(SimError::EmptyInput("panel has no symbols".to_string()));
        }
        if rows.is_empty() {
            return Err(SimError::EmptyInput("panel has no periods".to_string()));
        }
        if timestamps.len() != rows.len() {
            return Err(SimError::ShapeMismatch(format!(
                "{} timestamps for {} rows",
                timestamps.len(),
                rows.len()
            )));
        }
        if timestamps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SimError::InvalidInput(
                "timestamps must be strictly increasing".to_string(),
            ));
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != symbols.len() {
                return Err(SimError::ShapeMismatch(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    symbols.len()
                )));
            }
            for (j, value) in row.iter().enumerate() {
                if value.is_nan() {
                    return Err(SimError::MissingValue {
                        symbol: symbols[j].clone(),
                        period: i,
                    });
                }
            }
        }

        Ok(Self {
            timestamps,
            symbols,
            rows,
        })
    }

    /// Create a panel with synthetic daily timestamps.
    ///
    /// Convenient for tests and quick experiments where only the period
    /// ordering matters.
    pub fn from_rows(symbols: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let epoch = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..rows.len())
            .map(|i| epoch + Duration::days(i as i64))
            .collect();
        Self::new(timestamps, symbols, rows)
    }

    /// Create an all-zero panel with the same shape and labels as `other`.
    pub fn zeros_like(other: &Panel) -> Self {
        Self {
            timestamps: other.timestamps.clone(),
            symbols: other.symbols.clone(),
            rows: vec![vec![0.0; other.symbols.len()]; other.rows.len()],
        }
    }

    /// Number of periods (rows).
    pub fn num_periods(&self) -> usize {
        self.rows.len()
    }

    /// Number of assets (columns).
    pub fn num_assets(&self) -> usize {
        self.symbols.len()
    }

    /// Ordered asset symbols.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Period timestamps, strictly ascending.
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Values for period `i`.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    /// Single value at (period, asset column).
    pub fn value(&self, period: usize, asset: usize) -> f64 {
        self.rows[period][asset]
    }

    /// True when `other` carries the same symbols and timestamps.
    pub fn same_shape(&self, other: &Panel) -> bool {
        self.symbols == other.symbols && self.timestamps == other.timestamps
    }
}

/// Fixed-schema result row for one (period, asset) pair.
///
/// Signed conventions: `trade_value` is the quote-currency amount spent
/// (positive for buys, negative for sells), `commission` is a cost and is
/// zero or negative, `funding_payment` is positive when the position is
/// paid funding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    pub symbol: String,
    pub price: f64,
    pub funding_rate: f64,
    pub start_quantity: f64,
    pub equity: f64,
    pub start_weight: f64,
    pub target_weight: f64,
    pub adj_target_weight: f64,
    pub adj_delta_weight: f64,
    pub traded: bool,
    pub trade_value: f64,
    pub trade_quantity: f64,
    pub funding_payment: f64,
    pub commission: f64,
    pub end_quantity: f64,
}

impl PeriodRecord {
    /// An all-zero record for the given symbol.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            price: 0.0,
            funding_rate: 0.0,
            start_quantity: 0.0,
            equity: 0.0,
            start_weight: 0.0,
            target_weight: 0.0,
            adj_target_weight: 0.0,
            adj_delta_weight: 0.0,
            traded: false,
            trade_value: 0.0,
            trade_quantity: 0.0,
            funding_payment: 0.0,
            commission: 0.0,
            end_quantity: 0.0,
        }
    }
}

/// Append-only collection of [`PeriodRecord`]s indexed by (period, asset).
///
/// Every appended period carries exactly one record per universe symbol,
/// with the cash row last. This is the engine's sole output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    symbols: Vec<String>,
    records: Vec<PeriodRecord>,
}

impl Ledger {
    /// Create an empty ledger over the given universe (cash included).
    pub fn new(symbols: Vec<String>) -> Self {
        Self {
            symbols,
            records: Vec::new(),
        }
    }

    /// Universe symbols, in column order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Number of fully recorded periods.
    pub fn num_periods(&self) -> usize {
        self.records.len() / self.symbols.len()
    }

    /// Append one fully computed period. Partial periods are never emitted.
    pub(crate) fn push_period(&mut self, records: Vec<PeriodRecord>) {
        debug_assert_eq!(records.len(), self.symbols.len());
        self.records.extend(records);
    }

    /// All records for period `i`, in universe order.
    pub fn period(&self, i: usize) -> &[PeriodRecord] {
        let n = self.symbols.len();
        &self.records[i * n..(i + 1) * n]
    }

    /// Record for a (period, symbol) pair.
    pub fn get(&self, period: usize, symbol: &str) -> Option<&PeriodRecord> {
        if period >= self.num_periods() {
            return None;
        }
        let idx = self.symbols.iter().position(|s| s == symbol)?;
        Some(&self.records[period * self.symbols.len() + idx])
    }

    /// Mark-to-market total for period `i`: sum of equity across the
    /// universe, cash included.
    pub fn total_equity(&self, i: usize) -> f64 {
        self.period(i).iter().map(|r| r.equity).sum()
    }

    /// Iterate over every record in (period, asset) order.
    pub fn iter(&self) -> impl Iterator<Item = &PeriodRecord> {
        self.records.iter()
    }
}
