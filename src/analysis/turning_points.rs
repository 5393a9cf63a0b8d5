//! Local extrema detection over a symmetric comparison window.

use crate::models::{PointKind, TurningPoint};

/// Find peaks and troughs in `prices`.
///
/// Index `i` is a peak when its price is >= every price in
/// `[i - order, i + order]` and a trough when it is <= every price there.
/// Indices within `order` of either end are never classified. A window with
/// no variation at all is neither.
pub fn detect_turning_points(prices: &[f64], order: usize) -> Vec<TurningPoint> {
    if order == 0 || prices.len() < 2 * order + 1 {
        return Vec::new();
    }

    let mut points = Vec::new();

    for i in order..prices.len() - order {
        let price = prices[i];
        let window = &prices[i - order..=i + order];

        let (lo, hi) = window
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &p| {
                (lo.min(p), hi.max(p))
            });

        if lo == hi {
            continue;
        }
        if price >= hi {
            points.push(TurningPoint::new(i, price, PointKind::Peak));
        } else if price <= lo {
            points.push(TurningPoint::new(i, price, PointKind::Trough));
        }
    }

    points
}
