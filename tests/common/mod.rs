#![allow(dead_code)]

use sr_levels::data::{Bar, LevelKind, PriceSeries, RawLevel};

/// Bars whose highs and lows are given explicitly; open/close sit at the midpoint.
pub fn series(timeframe: &str, highs: &[f64], lows: &[f64]) -> PriceSeries {
    let bars = highs
        .iter()
        .zip(lows)
        .map(|(&high, &low)| {
            let mid = (high + low) / 2.0;
            Bar::new(mid, high, low, mid)
        })
        .collect();
    PriceSeries::new(timeframe, bars)
}

pub fn raw_level(price: f64, kind: LevelKind, touches: usize, timeframe: &str, weight: u32) -> RawLevel {
    RawLevel {
        price,
        kind,
        touch_count: touches,
        timeframe: timeframe.to_string(),
        weight,
        weighted_touches: touches * weight as usize,
        member_prices: vec![price; touches],
    }
}
