//! Five-point impulse wave validation.

use crate::models::{TurningPoint, WaveKind, WaveSegment};

use super::{ratio, FIB_618};

/// Check a `(w1, w2, w3, w4, w5)` price tuple against the impulse rules.
///
/// Both retracements must lie strictly inside `(0, 0.618)`, wave 3 must be
/// longer than wave 2's pullback, wave 5 must reach 61.8% of wave 3, and the
/// odd points must rise. Only upward impulses are recognized.
pub fn is_impulse(prices: &[f64; 5]) -> bool {
    let [w1, w2, w3, w4, w5] = *prices;

    let retrace2 = ratio(w1 - w2, w1 - w3);
    let retrace4 = ratio(w3 - w4, w3 - w5);

    let retrace_ok = |r: f64| r > 0.0 && r < FIB_618;

    retrace_ok(retrace2)
        && retrace_ok(retrace4)
        && (w3 - w2).abs() > (w2 - w1).abs()
        && (w5 - w4).abs() >= FIB_618 * (w3 - w2).abs()
        && w1 < w3
        && w3 < w5
}

/// Every window of five consecutive turning points that forms an impulse.
///
/// Windows may overlap; each is judged on its own.
pub fn find_impulse_waves(points: &[TurningPoint]) -> Vec<WaveSegment> {
    points
        .windows(5)
        .filter(|w| {
            is_impulse(&[
                w[0].price, w[1].price, w[2].price, w[3].price, w[4].price,
            ])
        })
        .filter_map(|w| WaveSegment::new(WaveKind::Impulse, w.to_vec()))
        .collect()
}
