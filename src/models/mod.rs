//! Data models for price series, waves, signals, decisions and symbol state.

mod price;
mod signal;
mod state;
mod trade;
mod wave;

pub use price::{PriceBar, PriceSeries};
pub use signal::{RejectReason, Signal, SignalLevels};
pub use state::{SymbolState, TradePlan};
pub use trade::{DecisionReason, OrderStatus, TradeDecision, TradeRecord, TradeSide};
pub use wave::{PointKind, TurningPoint, WaveKind, WaveSegment};
