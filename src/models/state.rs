//! Per-symbol signal and position state owned by the auto-trade loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Levels of the wave a position was entered on, kept for the exit rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub entry: f64,
    pub stop: f64,
    pub target: f64,

    /// Timestamp of the entry turning point (W3)
    pub entry_time: DateTime<Utc>,

    /// Timestamp of the target turning point (W5)
    pub target_time: DateTime<Utc>,
}

/// Signal edge detector plus the broker-reported position for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolState {
    /// Whether a buy signal was active on the previous evaluation
    pub last_signal_active: bool,

    /// Whether the broker reports an open (long) position
    pub position_open: bool,

    /// Broker-reported quantity; positive exactly when `position_open`
    pub position_qty: u64,

    /// Plan of the trade this loop entered, if any
    pub plan: Option<TradePlan>,
}

impl SymbolState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the position with broker truth. Only long quantities count as open.
    pub fn apply_broker_position(&mut self, quantity: Option<i64>) {
        let qty = quantity.filter(|q| *q > 0).map(|q| q as u64).unwrap_or(0);
        self.position_qty = qty;
        self.position_open = qty > 0;
        if !self.position_open {
            self.plan = None;
        }
    }

    /// `Flat` or `InPosition`, for display.
    pub fn phase(&self) -> &'static str {
        if self.position_open {
            "InPosition"
        } else {
            "Flat"
        }
    }
}
