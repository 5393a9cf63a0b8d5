//! Price series model: an ordered, immutable snapshot of (timestamp, price) bars.

use anyhow::{ensure, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single observation in a price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Bar timestamp (close time)
    pub timestamp: DateTime<Utc>,

    /// Price used for analysis (bar close)
    pub price: f64,
}

impl PriceBar {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Ordered price history for one symbol, strictly increasing in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series, rejecting bars that are not strictly increasing in time.
    pub fn new(bars: Vec<PriceBar>) -> Result<Self> {
        for pair in bars.windows(2) {
            ensure!(
                pair[0].timestamp < pair[1].timestamp,
                "price bars out of order: {} is not before {}",
                pair[0].timestamp,
                pair[1].timestamp
            );
        }
        Ok(Self { bars })
    }

    /// Empty series (no data this tick).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Prices in index order.
    pub fn prices(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.price).collect()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn timestamp_at(&self, index: usize) -> Option<DateTime<Utc>> {
        self.bars.get(index).map(|b| b.timestamp)
    }

    /// Prices of the bars whose timestamp lies in `[from, to]`.
    pub fn prices_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<f64> {
        let start = self.bars.partition_point(|b| b.timestamp < from);
        let end = self.bars.partition_point(|b| b.timestamp <= to);
        if start >= end {
            return Vec::new();
        }
        self.bars[start..end].iter().map(|b| b.price).collect()
    }

    /// Keep only the bars within `window` of the most recent bar.
    pub fn tail_within(&self, window: chrono::Duration) -> Self {
        let Some(last) = self.bars.last() else {
            return Self::empty();
        };
        let cutoff = last.timestamp - window;
        let start = self.bars.partition_point(|b| b.timestamp < cutoff);
        Self {
            bars: self.bars[start..].to_vec(),
        }
    }

    /// Series with one bar per price, spaced one hour apart.
    #[cfg(test)]
    pub fn from_prices(start: DateTime<Utc>, prices: &[f64]) -> Self {
        let bars = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| PriceBar::new(start + chrono::Duration::hours(i as i64), p))
            .collect();
        Self { bars }
    }
}
