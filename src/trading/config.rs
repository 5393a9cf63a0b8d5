//! Trading configuration.

use anyhow::{ensure, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Configuration for wave detection, signal filtering and position sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Fraction of account balance risked per trade (0.0 to 1.0]
    pub risk_fraction: Decimal,

    /// Half-width of the turning-point comparison window
    pub turning_point_order: usize,

    /// RSI lookback period
    pub rsi_period: usize,

    /// RSI level above which an entry is rejected as overbought
    pub rsi_overbought: f64,

    /// MACD fast EMA period
    pub macd_fast: usize,

    /// MACD slow EMA period
    pub macd_slow: usize,

    /// MACD signal EMA period
    pub macd_signal: usize,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            risk_fraction: dec!(0.01), // 1% of balance per trade
            turning_point_order: 5,
            rsi_period: 14,
            rsi_overbought: 70.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

impl TradingConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.risk_fraction > Decimal::ZERO && self.risk_fraction <= Decimal::ONE,
            "risk fraction must be in (0, 1], got {}",
            self.risk_fraction
        );
        ensure!(self.turning_point_order > 0, "turning point order must be positive");
        ensure!(self.rsi_period > 0, "RSI period must be positive");
        ensure!(
            self.macd_fast > 0 && self.macd_signal > 0,
            "MACD periods must be positive"
        );
        ensure!(
            self.macd_fast < self.macd_slow,
            "MACD fast period ({}) must be shorter than slow period ({})",
            self.macd_fast,
            self.macd_slow
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(TradingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_risk = TradingConfig {
            risk_fraction: dec!(1.5),
            ..Default::default()
        };
        assert!(bad_risk.validate().is_err());

        let zero_order = TradingConfig {
            turning_point_order: 0,
            ..Default::default()
        };
        assert!(zero_order.validate().is_err());

        let inverted_macd = TradingConfig {
            macd_fast: 26,
            macd_slow: 12,
            ..Default::default()
        };
        assert!(inverted_macd.validate().is_err());
    }
}
