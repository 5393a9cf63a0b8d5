//! Market-data and broker interfaces plus the offline implementations.

mod csv_history;
#[cfg(test)]
mod memory;
mod paper_broker;

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{BrokerError, DataError};
use crate::models::{PriceSeries, TradeSide};

pub use csv_history::CsvHistory;
#[cfg(test)]
pub use memory::InMemoryHistory;
pub use paper_broker::PaperBroker;

/// Bar granularity of a history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarSize {
    Minutes(u32),
    Hours(u32),
    Days(u32),
}

impl Default for BarSize {
    fn default() -> Self {
        BarSize::Hours(1)
    }
}

impl fmt::Display for BarSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (n, unit) = match *self {
            BarSize::Minutes(n) => (n, "min"),
            BarSize::Hours(n) => (n, "hour"),
            BarSize::Days(n) => (n, "day"),
        };
        let plural = if n == 1 { "" } else { "s" };
        write!(f, "{} {}{}", n, unit, plural)
    }
}

impl FromStr for BarSize {
    type Err = anyhow::Error;

    /// Parses `"1 hour"`, `"5 mins"`, `"1 day"` and the compact `"15m"`, `"4h"`, `"1d"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (count, unit) = s.split_at(split);
        let count: u32 = count
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid bar size: {}", s))?;
        if count == 0 {
            bail!("bar size must be positive: {}", s);
        }

        match unit.trim() {
            "m" | "min" | "mins" | "minute" | "minutes" => Ok(BarSize::Minutes(count)),
            "h" | "hour" | "hours" => Ok(BarSize::Hours(count)),
            "d" | "day" | "days" => Ok(BarSize::Days(count)),
            other => bail!("unknown bar size unit: {}", other),
        }
    }
}

/// How much history to fetch and at what granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRequest {
    pub duration: chrono::Duration,
    pub bar_size: BarSize,
}

impl HistoryRequest {
    pub fn days(days: i64, bar_size: BarSize) -> Self {
        Self {
            duration: chrono::Duration::days(days),
            bar_size,
        }
    }
}

/// Account funds reported by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub cash: Decimal,
    pub buying_power: Decimal,
}

/// Broker acknowledgement of a submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHandle {
    pub order_id: String,
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: u64,
    pub submitted_at: DateTime<Utc>,
}

/// Source of historical prices.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Closing prices for `symbol`, oldest first. An empty series means no data.
    async fn fetch_history(
        &self,
        symbol: &str,
        request: &HistoryRequest,
    ) -> Result<PriceSeries, DataError>;
}

/// Order routing and account queries.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn connect(&self) -> Result<(), BrokerError>;

    async fn disconnect(&self) -> Result<(), BrokerError>;

    fn is_connected(&self) -> bool;

    async fn account_balance(&self) -> Result<AccountBalance, BrokerError>;

    /// Signed quantity held in `symbol`; `None` when there is no position.
    async fn position(&self, symbol: &str) -> Result<Option<i64>, BrokerError>;

    async fn submit_order(
        &self,
        symbol: &str,
        side: TradeSide,
        quantity: u64,
    ) -> Result<OrderHandle, BrokerError>;
}
