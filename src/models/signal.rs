//! Wave-derived trading signals.

use serde::{Deserialize, Serialize};

use super::{TradeSide, WaveSegment};

/// Why the momentum filter rejected a wave candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    /// RSI at the entry point above the overbought level
    Overbought { rsi: f64 },
    /// MACD histogram at the entry point below zero
    BearishMomentum { histogram: f64 },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Overbought { .. } => write!(f, "overbought"),
            RejectReason::BearishMomentum { .. } => write!(f, "bearish momentum"),
        }
    }
}

/// Entry, stop and target levels taken from an impulse wave.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalLevels {
    /// Series index of the entry (W3)
    pub entry_index: usize,
    pub entry: f64,

    /// Stop-loss reference (W2)
    pub stop: f64,

    /// Series index of the target exit (W5)
    pub target_index: usize,
    pub target: f64,
}

/// Outcome of running a wave through the signal filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub direction: TradeSide,
    pub source: WaveSegment,
    pub accepted: bool,
    pub reject_reason: Option<RejectReason>,
    pub levels: SignalLevels,
}

impl Signal {
    pub fn accept(
        symbol: &str,
        direction: TradeSide,
        source: WaveSegment,
        levels: SignalLevels,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            direction,
            source,
            accepted: true,
            reject_reason: None,
            levels,
        }
    }

    pub fn reject(
        symbol: &str,
        direction: TradeSide,
        source: WaveSegment,
        levels: SignalLevels,
        reason: RejectReason,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            direction,
            source,
            accepted: false,
            reject_reason: Some(reason),
            levels,
        }
    }

    /// True for an accepted buy.
    pub fn is_active_buy(&self) -> bool {
        self.accepted && self.direction == TradeSide::Buy
    }
}
