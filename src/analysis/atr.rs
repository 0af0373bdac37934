use crate::data::{Bar, PriceSeries};

pub const DEFAULT_ATR_PERIOD: usize = 14;

/// True Range per bar; the first bar has no previous close and uses high - low.
pub fn true_ranges(bars: &[Bar]) -> Vec<f64> {
    let mut ranges = Vec::with_capacity(bars.len());
    for (idx, bar) in bars.iter().enumerate() {
        let tr = if idx == 0 {
            bar.high - bar.low
        } else {
            let prev = &bars[idx - 1];
            let high_low = bar.high - bar.low;
            let high_close = (bar.high - prev.close).abs();
            let low_close = (bar.low - prev.close).abs();
            high_low.max(high_close).max(low_close)
        };
        ranges.push(tr.max(0.0));
    }
    ranges
}

/// Simple rolling mean of True Range over `period` bars.
///
/// Bars before the window fills use the mean of what is available so far.
pub fn rolling_atr(bars: &[Bar], period: usize) -> Vec<f64> {
    if bars.is_empty() || period == 0 {
        return Vec::new();
    }

    let ranges = true_ranges(bars);
    let mut atr_values = Vec::with_capacity(ranges.len());
    let mut window_sum = 0.0;
    for (idx, tr) in ranges.iter().enumerate() {
        window_sum += tr;
        if idx >= period {
            window_sum -= ranges[idx - period];
        }
        let width = (idx + 1).min(period);
        atr_values.push(window_sum / width as f64);
    }
    atr_values
}

/// Most recent ATR value of a series.
pub fn latest_atr(series: &PriceSeries, period: usize) -> Option<f64> {
    rolling_atr(&series.bars, period)
        .last()
        .copied()
        .filter(|atr| atr.is_finite())
}

/// Highest latest ATR among all series; the volatility reference for tolerance.
pub fn max_latest_atr(series: &[PriceSeries], period: usize) -> Option<f64> {
    series
        .iter()
        .filter_map(|s| latest_atr(s, period))
        .fold(None, |best, atr| match best {
            Some(current) if current >= atr => Some(current),
            _ => Some(atr),
        })
}
