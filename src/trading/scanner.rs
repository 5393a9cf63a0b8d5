//! One analysis pass over a price series: turning points, waves and filtered signals.

use tracing::debug;

use crate::analysis::{
    detect_turning_points, find_corrective_waves, find_impulse_waves, IndicatorSet,
};
use crate::models::{PriceSeries, Signal, TurningPoint, WaveSegment};

use super::state_machine::{exit_rule, ExitDecision};
use super::{SignalFilter, TradingConfig};

/// Everything one pass found for a symbol.
#[derive(Debug, Clone)]
pub struct WaveAnalysis {
    pub symbol: String,
    pub turning_points: Vec<TurningPoint>,
    pub impulses: Vec<WaveSegment>,
    pub correctives: Vec<WaveSegment>,
    /// One filter outcome per impulse, in the same order
    pub signals: Vec<Signal>,
}

impl WaveAnalysis {
    /// The signal of the most recent impulse, if the filter accepted it.
    ///
    /// Older waves are already resolved and are never actionable, even when
    /// the newest one is rejected.
    pub fn actionable_signal(&self) -> Option<&Signal> {
        self.signals
            .iter()
            .max_by_key(|s| s.source.last_index())
            .filter(|s| s.is_active_buy())
    }

    pub fn accepted_signals(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|s| s.accepted)
    }
}

/// How an accepted historical signal would have exited.
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub signal: Signal,
    pub exit: ExitDecision,
}

/// Runs detector, validators and filter over a series.
#[derive(Debug, Clone)]
pub struct WaveScanner {
    config: TradingConfig,
    filter: SignalFilter,
}

impl WaveScanner {
    pub fn new(config: TradingConfig) -> Self {
        let filter = SignalFilter::new(&config);
        Self { config, filter }
    }

    pub fn analyze(&self, symbol: &str, series: &PriceSeries) -> WaveAnalysis {
        let prices = series.prices();
        let turning_points = detect_turning_points(&prices, self.config.turning_point_order);
        let impulses = find_impulse_waves(&turning_points);
        let correctives = find_corrective_waves(&turning_points);

        let signals = if impulses.is_empty() {
            Vec::new()
        } else {
            let indicators = IndicatorSet::compute(
                &prices,
                self.config.rsi_period,
                self.config.macd_fast,
                self.config.macd_slow,
                self.config.macd_signal,
            );
            impulses
                .iter()
                .filter_map(|wave| self.filter.evaluate(symbol, wave, &indicators))
                .collect()
        };

        debug!(
            symbol = %symbol,
            bars = prices.len(),
            turning_points = turning_points.len(),
            impulses = impulses.len(),
            correctives = correctives.len(),
            "Wave analysis complete"
        );

        WaveAnalysis {
            symbol: symbol.to_string(),
            turning_points,
            impulses,
            correctives,
            signals,
        }
    }

    /// Report-only replay of every accepted signal in the window. Never used to
    /// place orders: these waves have already played out.
    pub fn replay(&self, analysis: &WaveAnalysis, series: &PriceSeries) -> Vec<ReplayOutcome> {
        let prices = series.prices();
        analysis
            .accepted_signals()
            .filter_map(|signal| {
                let window = prices.get(signal.levels.entry_index..=signal.levels.target_index)?;
                Some(ReplayOutcome {
                    signal: signal.clone(),
                    exit: exit_rule(window, signal.levels.stop, signal.levels.target),
                })
            })
            .collect()
    }
}
