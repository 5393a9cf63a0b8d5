//! Per-symbol Flat/InPosition state machine with edge-triggered entries.
//!
//! Each evaluation:
//! - refreshes the position from the broker (broker truth wins over our own
//!   past decisions)
//! - enters only when a buy signal appears fresh (false -> true) while flat
//! - exits an open position at the stop or the wave target, depending on
//!   whether the stop was breached between entry and target
//! - remembers whether a buy signal was active, whatever else happened

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::models::{
    DecisionReason, PriceSeries, Signal, SymbolState, TradeDecision, TradePlan, TradeSide,
};

use super::{PositionSizer, TradingConfig};

/// Exit price and why.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitDecision {
    pub reason: DecisionReason,
    pub price: f64,
    /// Lowest price seen in the exit window, if it was non-empty
    pub window_low: Option<f64>,
}

/// Stop-loss if any price in `window` touched or went below `stop`,
/// otherwise the wave target. An empty window counts as no breach.
pub fn exit_rule(window: &[f64], stop: f64, target: f64) -> ExitDecision {
    let window_low = window.iter().copied().reduce(f64::min);

    match window_low {
        Some(low) if low <= stop => ExitDecision {
            reason: DecisionReason::StopLoss,
            price: stop,
            window_low,
        },
        _ => ExitDecision {
            reason: DecisionReason::Target,
            price: target,
            window_low,
        },
    }
}

/// Inputs observed for one symbol on one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickInput<'a> {
    /// Actionable signal this tick, if any
    pub signal: Option<&'a Signal>,

    /// Price history the signal was derived from
    pub series: &'a PriceSeries,

    /// Quantity the broker reports (`None` = no position)
    pub broker_position: Option<i64>,

    /// Balance used for sizing new entries
    pub balance: Decimal,
}

/// Converts signals and broker state into trade decisions.
#[derive(Debug, Clone)]
pub struct TradingStateMachine {
    sizer: PositionSizer,
}

impl TradingStateMachine {
    pub fn new(config: &TradingConfig) -> Self {
        Self {
            sizer: PositionSizer::new(config),
        }
    }

    /// Advance `state` by one tick and return the decision to dispatch, if any.
    ///
    /// Never marks a position opened or closed on the strength of its own
    /// decisions; the next tick's broker query does that.
    pub fn evaluate(
        &self,
        symbol: &str,
        state: &mut SymbolState,
        tick: TickInput<'_>,
    ) -> Option<TradeDecision> {
        state.apply_broker_position(tick.broker_position);

        let buy_signal = tick.signal.filter(|s| s.is_active_buy());
        let buy_active = buy_signal.is_some();

        let decision = match buy_signal {
            Some(signal) if !state.position_open && !state.last_signal_active => {
                self.enter(symbol, state, signal, &tick)
            }
            _ if state.position_open => self.exit(symbol, state, &tick),
            Some(_) => {
                debug!(symbol = %symbol, "Buy signal still active, entry already taken");
                None
            }
            None => None,
        };

        state.last_signal_active = buy_active;
        decision
    }

    fn enter(
        &self,
        symbol: &str,
        state: &mut SymbolState,
        signal: &Signal,
        tick: &TickInput<'_>,
    ) -> Option<TradeDecision> {
        let levels = signal.levels;
        let (Ok(entry), Ok(stop)) = (
            Decimal::try_from(levels.entry),
            Decimal::try_from(levels.stop),
        ) else {
            warn!(
                symbol = %symbol,
                entry = levels.entry,
                stop = levels.stop,
                "Signal levels not representable"
            );
            return None;
        };

        let quantity = self.sizer.calculate_size(tick.balance, entry, stop);
        if quantity == 0 {
            info!(
                symbol = %symbol,
                balance = %tick.balance,
                entry = %entry,
                stop = %stop,
                "Position size is zero, skipping entry"
            );
            return None;
        }

        state.plan = match (
            tick.series.timestamp_at(levels.entry_index),
            tick.series.timestamp_at(levels.target_index),
        ) {
            (Some(entry_time), Some(target_time)) => Some(TradePlan {
                entry: levels.entry,
                stop: levels.stop,
                target: levels.target,
                entry_time,
                target_time,
            }),
            _ => None,
        };

        info!(
            symbol = %symbol,
            quantity = quantity,
            entry = %entry,
            stop = %stop,
            target = levels.target,
            "Fresh impulse signal, entering"
        );

        Some(TradeDecision {
            symbol: symbol.to_string(),
            direction: TradeSide::Buy,
            quantity,
            reference_price: entry,
            reason: DecisionReason::Entry,
        })
    }

    fn exit(
        &self,
        symbol: &str,
        state: &SymbolState,
        tick: &TickInput<'_>,
    ) -> Option<TradeDecision> {
        let exit = if let Some(plan) = state.plan {
            let window = tick.series.prices_between(plan.entry_time, plan.target_time);
            exit_rule(&window, plan.stop, plan.target)
        } else if let Some(signal) = tick.signal {
            let levels = signal.levels;
            let window = tick
                .series
                .prices()
                .get(levels.entry_index..=levels.target_index)
                .map(<[f64]>::to_vec)
                .unwrap_or_default();
            exit_rule(&window, levels.stop, levels.target)
        } else {
            warn!(
                symbol = %symbol,
                quantity = state.position_qty,
                "Open position without a wave plan, cannot evaluate exit"
            );
            return None;
        };

        let Ok(price) = Decimal::try_from(exit.price) else {
            warn!(symbol = %symbol, price = exit.price, "Exit price not representable");
            return None;
        };

        info!(
            symbol = %symbol,
            reason = ?exit.reason,
            price = %price,
            window_low = ?exit.window_low,
            quantity = state.position_qty,
            "Exit triggered"
        );

        Some(TradeDecision {
            symbol: symbol.to_string(),
            direction: TradeSide::Sell,
            quantity: state.position_qty,
            reference_price: price,
            reason: exit.reason,
        })
    }
}
