//! Price pattern analysis: turning points, wave validation, momentum indicators.

mod corrective;
mod impulse;
pub mod indicators;
mod turning_points;

pub use corrective::find_corrective_waves;
pub use impulse::find_impulse_waves;
pub use indicators::IndicatorSet;
pub use turning_points::detect_turning_points;

/// Fibonacci reference levels used by the wave validators.
pub const FIB_382: f64 = 0.382;
pub const FIB_618: f64 = 0.618;
pub const FIB_786: f64 = 0.786;

/// `num / den`, or 0 when the denominator is zero.
pub(crate) fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}
