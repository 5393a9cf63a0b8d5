//! Momentum gate applied to impulse-wave entry candidates.

use tracing::debug;

use crate::analysis::IndicatorSet;
use crate::models::{RejectReason, Signal, SignalLevels, TradeSide, WaveKind, WaveSegment};

use super::TradingConfig;

/// Filters impulse waves with RSI and MACD histogram at the entry point.
#[derive(Debug, Clone)]
pub struct SignalFilter {
    rsi_overbought: f64,
}

impl SignalFilter {
    pub fn new(config: &TradingConfig) -> Self {
        Self {
            rsi_overbought: config.rsi_overbought,
        }
    }

    /// Entry at W3, stop at W2, target at W5.
    pub fn levels(wave: &WaveSegment) -> Option<SignalLevels> {
        if wave.kind != WaveKind::Impulse {
            return None;
        }
        let stop = wave.point(2)?;
        let entry = wave.point(3)?;
        let target = wave.point(5)?;
        Some(SignalLevels {
            entry_index: entry.index,
            entry: entry.price,
            stop: stop.price,
            target_index: target.index,
            target: target.price,
        })
    }

    /// Turn an impulse wave into an accepted or rejected buy signal.
    ///
    /// Rules, first match wins: RSI above the overbought level, then a
    /// negative MACD histogram. Undefined indicator values never reject.
    /// Returns `None` for anything but an impulse wave.
    pub fn evaluate(
        &self,
        symbol: &str,
        wave: &WaveSegment,
        indicators: &IndicatorSet,
    ) -> Option<Signal> {
        let levels = Self::levels(wave)?;
        let rsi = indicators.rsi_at(levels.entry_index);
        let macd = indicators.macd_at(levels.entry_index);
        let histogram = macd.histogram;

        let rejection = if rsi > self.rsi_overbought {
            Some(RejectReason::Overbought { rsi })
        } else if histogram < 0.0 {
            Some(RejectReason::BearishMomentum { histogram })
        } else {
            None
        };

        let signal = match rejection {
            Some(reason) => {
                debug!(
                    symbol = %symbol,
                    entry_index = levels.entry_index,
                    macd_line = macd.line,
                    macd_signal = macd.signal,
                    reason = %reason,
                    "Impulse candidate rejected"
                );
                Signal::reject(symbol, TradeSide::Buy, wave.clone(), levels, reason)
            }
            None => {
                debug!(
                    symbol = %symbol,
                    entry_index = levels.entry_index,
                    rsi = rsi,
                    macd_line = macd.line,
                    macd_signal = macd.signal,
                    "Impulse candidate accepted"
                );
                Signal::accept(symbol, TradeSide::Buy, wave.clone(), levels)
            }
        };

        Some(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::indicators::Macd;
    use crate::models::{PointKind, TurningPoint};

    fn wave() -> WaveSegment {
        let prices = [10.0, 13.0, 20.0, 24.0, 30.0];
        let points = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| TurningPoint::new(i * 2 + 1, p, PointKind::Peak))
            .collect();
        WaveSegment::new(WaveKind::Impulse, points).unwrap()
    }

    fn indicators(rsi_at_entry: f64, hist_at_entry: f64) -> IndicatorSet {
        let mut rsi = vec![50.0; 12];
        let mut hist = vec![0.5; 12];
        rsi[5] = rsi_at_entry;
        hist[5] = hist_at_entry;
        IndicatorSet {
            rsi,
            macd: Macd {
                line: vec![f64::NAN; 12],
                signal: vec![f64::NAN; 12],
                histogram: hist,
            },
        }
    }

    #[test]
    fn test_accepts_and_sets_levels() {
        let filter = SignalFilter::new(&TradingConfig::default());
        let signal = filter.evaluate("AAPL", &wave(), &indicators(55.0, 0.2)).unwrap();

        assert!(signal.accepted);
        assert!(signal.is_active_buy());
        assert_eq!(signal.levels.entry, 20.0);
        assert_eq!(signal.levels.entry_index, 5);
        assert_eq!(signal.levels.stop, 13.0);
        assert_eq!(signal.levels.target, 30.0);
        assert_eq!(signal.levels.target_index, 9);
    }

    #[test]
    fn test_overbought_rejected() {
        let filter = SignalFilter::new(&TradingConfig::default());
        let signal = filter.evaluate("AAPL", &wave(), &indicators(75.0, 0.2)).unwrap();

        assert!(!signal.accepted);
        assert!(!signal.is_active_buy());
        assert_eq!(signal.reject_reason.unwrap().to_string(), "overbought");
    }

    #[test]
    fn test_overbought_checked_before_macd() {
        let filter = SignalFilter::new(&TradingConfig::default());
        let signal = filter.evaluate("AAPL", &wave(), &indicators(80.0, -1.0)).unwrap();
        assert_eq!(signal.reject_reason.unwrap().to_string(), "overbought");
    }

    #[test]
    fn test_bearish_momentum_rejected() {
        let filter = SignalFilter::new(&TradingConfig::default());
        let signal = filter.evaluate("AAPL", &wave(), &indicators(60.0, -0.01)).unwrap();
        assert_eq!(signal.reject_reason.unwrap().to_string(), "bearish momentum");
    }

    #[test]
    fn test_boundary_values_pass() {
        let filter = SignalFilter::new(&TradingConfig::default());
        let signal = filter.evaluate("AAPL", &wave(), &indicators(70.0, 0.0)).unwrap();
        assert!(signal.accepted);
    }

    #[test]
    fn test_undefined_indicators_pass() {
        let filter = SignalFilter::new(&TradingConfig::default());
        let signal = filter
            .evaluate("AAPL", &wave(), &indicators(f64::NAN, f64::NAN))
            .unwrap();
        assert!(signal.accepted);
    }

    #[test]
    fn test_corrective_wave_not_a_candidate() {
        let points = vec![
            TurningPoint::new(1, 100.0, PointKind::Trough),
            TurningPoint::new(3, 105.0, PointKind::Peak),
            TurningPoint::new(5, 90.0, PointKind::Trough),
        ];
        let corrective = WaveSegment::new(WaveKind::Corrective, points).unwrap();
        let filter = SignalFilter::new(&TradingConfig::default());
        assert!(filter.evaluate("AAPL", &corrective, &indicators(50.0, 1.0)).is_none());
    }
}
