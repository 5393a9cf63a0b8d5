//! Three-point A-B-C corrective wave validation.

use crate::models::{TurningPoint, WaveKind, WaveSegment};

use super::{ratio, FIB_382, FIB_786};

/// Check an `(a, b, c)` price tuple: B retraces 38.2%..78.6% of the net A→C
/// move and overshoots A against that move (zig-zag).
pub fn is_corrective(prices: &[f64; 3]) -> bool {
    let [a, b, c] = *prices;

    let retrace_b = ratio((b - a).abs(), (c - a).abs());
    let zig_zag = (c < a && b > a) || (c > a && b < a);

    (FIB_382..=FIB_786).contains(&retrace_b) && zig_zag
}

/// Every window of three consecutive turning points that forms a correction.
pub fn find_corrective_waves(points: &[TurningPoint]) -> Vec<WaveSegment> {
    points
        .windows(3)
        .filter(|w| is_corrective(&[w[0].price, w[1].price, w[2].price]))
        .filter_map(|w| WaveSegment::new(WaveKind::Corrective, w.to_vec()))
        .collect()
}
