//! Trade decisions emitted by the state machine and the trade log kept for them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

impl std::str::FromStr for TradeSide {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            other => anyhow::bail!("unknown trade side: {}", other),
        }
    }
}

/// What triggered a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionReason {
    /// Fresh impulse signal while flat
    Entry,
    /// Exit window breached the stop-loss
    StopLoss,
    /// Exit at the wave target
    Target,
    /// Operator-submitted order
    Manual,
}

/// Order the state machine wants dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDecision {
    pub symbol: String,
    pub direction: TradeSide,
    pub quantity: u64,
    pub reference_price: Decimal,
    pub reason: DecisionReason,
}

impl std::fmt::Display for TradeDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} x{} @ {} ({:?})",
            self.direction.as_str(),
            self.symbol,
            self.quantity,
            self.reference_price.round_dp(4),
            self.reason
        )
    }
}

/// Result of handing a decision to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OrderStatus {
    Accepted { order_id: String },
    Failed { error: String },
}

/// Trade log entry. Fill confirmation is not tracked, only the dispatch attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub decision: TradeDecision,
    pub status: OrderStatus,
}

impl TradeRecord {
    pub fn new(decision: TradeDecision, status: OrderStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            decision,
            status,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self.status, OrderStatus::Accepted { .. })
    }
}
