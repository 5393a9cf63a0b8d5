//! Shared fixtures for unit tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::models::PriceSeries;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap()
}

fn warm_up() -> Vec<f64> {
    (0..40).map(|i| if i % 2 == 0 { 12.3 } else { 11.7 }).collect()
}

/// 130 hourly closes whose order-5 turning points end in the impulse
/// 10, 13, 20, 24, 30 at indices 43, 50, 80, 98, 124. The climb into W3 is
/// choppy enough that RSI(14) stays near 68 and the MACD histogram is
/// positive there, so the default filter accepts it.
pub fn accepted_impulse_prices() -> Vec<f64> {
    let mut prices = warm_up();
    prices.extend_from_slice(&[
        11.5, 11.0, 10.5, 10.0, 11.0, 10.5, 11.5, 11.0, 12.0, 11.5, 13.0, 12.8, 12.65, 12.55,
        12.65, 12.75, 13.75, 13.25, 14.25, 13.75, 14.75, 14.25, 15.25, 14.75, 15.75, 15.25,
        16.25, 15.75, 16.75, 16.25, 17.25, 16.75, 17.75, 17.25, 18.25, 17.75, 18.75, 18.25,
        19.25, 18.75, 20.0, 19.8, 19.65, 19.55, 19.65, 19.75, 20.75, 20.25, 21.25, 20.75,
        21.75, 21.25, 22.25, 21.75, 22.75, 22.25, 23.25, 22.75, 24.0, 23.8, 23.65, 23.55,
        23.65, 23.75, 24.75, 24.25, 25.25, 24.75, 25.75, 25.25, 26.25, 25.75, 26.75, 26.25,
        27.25, 26.75, 27.75, 27.25, 28.25, 27.75, 28.75, 28.25, 29.25, 28.75, 30.0, 29.8,
        29.65, 29.55, 29.65, 29.75,
    ]);
    prices
}

/// Same impulse shape, but the rally into W3 (index 59) is steep enough to
/// push RSI(14) above 80 there.
pub fn overbought_impulse_prices() -> Vec<f64> {
    let mut prices = warm_up();
    prices.extend_from_slice(&[
        11.5, 11.0, 10.5, 10.0, 10.6, 11.2, 11.8, 12.4, 13.0, 12.6, 12.3, 12.0, 12.2, 12.5, 12.8,
        13.5, 14.5, 16.0, 17.5, 20.0, 19.0, 18.0, 17.6, 17.9, 18.5, 19.4, 21.0, 22.5, 24.0,
        23.0, 22.4, 22.0, 22.6, 23.4, 24.6, 26.0, 27.5, 28.5, 30.0, 29.2, 28.6, 28.0, 28.3,
        28.8,
    ]);
    prices
}

pub fn accepted_impulse_series() -> PriceSeries {
    PriceSeries::from_prices(t0(), &accepted_impulse_prices())
}

pub fn overbought_impulse_series() -> PriceSeries {
    PriceSeries::from_prices(t0(), &overbought_impulse_prices())
}
