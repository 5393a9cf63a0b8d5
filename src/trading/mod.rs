//! Trading logic: signal filtering, position sizing, per-symbol state machine.

mod config;
mod position_sizer;
mod scanner;
mod signal_filter;
mod state_machine;

pub use config::TradingConfig;
pub use position_sizer::PositionSizer;
pub use scanner::WaveScanner;
pub use signal_filter::SignalFilter;
pub use state_machine::{TickInput, TradingStateMachine};
