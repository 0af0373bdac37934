use std::cmp::Ordering;

use serde::Serialize;

use crate::data::{LevelKind, PriceObservation, PriceSeries};

/// Explanation of why a price interval produced no level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeDiagnostics {
    pub range_start: f64,
    pub range_end: f64,
    pub matching_observations: Vec<PriceObservation>,
    pub distinct_prices: usize,
    pub min_observed_gap: Option<f64>,
    pub suggested_tolerance_percent: Option<f64>,
}

/// Collect every high/low in `[start, end]` and suggest the smallest per-level tolerance
/// that would merge the closest pair of distinct observed prices.
///
/// Bounds given in reverse order are swapped.
pub fn diagnose(series: &[PriceSeries], start: f64, end: f64) -> RangeDiagnostics {
    let (low, high) = if start <= end { (start, end) } else { (end, start) };

    let mut matching_observations = Vec::new();
    for s in series {
        for kind in LevelKind::ALL {
            for price in s.observations(kind) {
                if price.is_finite() && price >= low && price <= high {
                    matching_observations.push(PriceObservation {
                        timeframe: s.timeframe.clone(),
                        kind,
                        price,
                    });
                }
            }
        }
    }

    let mut distinct: Vec<f64> = matching_observations.iter().map(|o| o.price).collect();
    distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    distinct.dedup();

    let min_observed_gap = distinct
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold(None, |best: Option<f64>, gap| match best {
            Some(current) if current <= gap => Some(current),
            _ => Some(gap),
        });

    let midpoint = (low + high) / 2.0;
    let suggested_tolerance_percent = min_observed_gap
        .filter(|_| midpoint > 0.0)
        .map(|gap| gap / midpoint * 100.0);

    RangeDiagnostics {
        range_start: low,
        range_end: high,
        distinct_prices: distinct.len(),
        matching_observations,
        min_observed_gap,
        suggested_tolerance_percent,
    }
}
