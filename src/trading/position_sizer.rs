//! Risk-budget position sizing: risk a fixed fraction of balance down to the stop.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use super::TradingConfig;

/// Calculator for share counts from a risk budget and a stop distance.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    risk_fraction: Decimal,
}

impl PositionSizer {
    /// Create a new position sizer with given config.
    pub fn new(config: &TradingConfig) -> Self {
        Self {
            risk_fraction: config.risk_fraction,
        }
    }

    /// Calculate the share count for a trade.
    ///
    /// # Arguments
    /// * `balance` - Account balance available to risk
    /// * `entry` - Planned entry price
    /// * `stop` - Stop-loss price
    ///
    /// # Returns
    /// Whole shares, 0 meaning no trade
    pub fn calculate_size(&self, balance: Decimal, entry: Decimal, stop: Decimal) -> u64 {
        risk_based_size(balance, self.risk_fraction, entry, stop)
    }
}

/// `floor(balance * risk_fraction / |entry - stop|)`.
///
/// Returns 0 for a zero stop distance, a non-positive balance, a risk
/// fraction outside `(0, 1]` or a quotient too large for `Decimal`.
pub fn risk_based_size(
    balance: Decimal,
    risk_fraction: Decimal,
    entry: Decimal,
    stop: Decimal,
) -> u64 {
    let stop_distance = (entry - stop).abs();
    if stop_distance.is_zero() {
        debug!(entry = %entry, "Zero stop distance, no trade");
        return 0;
    }
    if balance <= Decimal::ZERO || risk_fraction <= Decimal::ZERO || risk_fraction > Decimal::ONE {
        return 0;
    }

    let risk_budget = balance * risk_fraction;
    match risk_budget.checked_div(stop_distance) {
        Some(shares) => shares.floor().to_u64().unwrap_or(0),
        None => {
            debug!(
                budget = %risk_budget,
                stop_distance = %stop_distance,
                "Size overflows, no trade"
            );
            0
        }
    }
}
