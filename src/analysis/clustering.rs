use std::cmp::Ordering;

use clap::ValueEnum;
use serde::Serialize;
use statrs::statistics::{Data, Median, Statistics};

use crate::analysis::tolerance::ToleranceModel;
use crate::data::{LevelKind, RawLevel};
use crate::error::LevelError;

/// Admission rule used while scanning sorted prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
pub enum GroupingStrategy {
    /// Join when within tolerance of the nearest member.
    #[default]
    Conservative,
    /// Join when within tolerance of the running centroid.
    Aggressive,
}

/// Origin of a series: its label and the weight assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesOrigin<'a> {
    pub timeframe: &'a str,
    pub weight: u32,
}

/// Split prices into contiguous groups by a single ascending scan.
///
/// Non-finite values are dropped. Every group is non-empty and groups come out in
/// ascending price order.
pub fn group_prices(
    prices: &[f64],
    strategy: GroupingStrategy,
    tolerance: &ToleranceModel,
) -> Vec<Vec<f64>> {
    let mut sorted: Vec<f64> = prices.iter().copied().filter(|p| p.is_finite()).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mut groups = Vec::new();
    let mut buffer: Vec<f64> = Vec::new();
    let mut buffer_sum = 0.0;

    for price in sorted {
        if buffer.is_empty() {
            buffer.push(price);
            buffer_sum = price;
            continue;
        }

        let centroid = buffer_sum / buffer.len() as f64;
        let distance = match strategy {
            // Ascending input: the nearest member is always the last one.
            GroupingStrategy::Conservative => buffer
                .last()
                .map(|last| (price - last).abs())
                .unwrap_or(f64::INFINITY),
            GroupingStrategy::Aggressive => (price - centroid).abs(),
        };

        if distance <= tolerance.tolerance_for(centroid) {
            buffer.push(price);
            buffer_sum += price;
        } else {
            groups.push(std::mem::take(&mut buffer));
            buffer.push(price);
            buffer_sum = price;
        }
    }
    if !buffer.is_empty() {
        groups.push(buffer);
    }

    groups
}

/// Median for three or more members, mean otherwise.
pub fn representative_price(members: &[f64]) -> f64 {
    if members.len() >= 3 {
        Data::new(members.to_vec()).median()
    } else {
        members.iter().mean()
    }
}

/// Cluster one timeframe's highs or lows into raw levels.
pub fn cluster(
    prices: &[f64],
    kind: LevelKind,
    strategy: GroupingStrategy,
    tolerance: &ToleranceModel,
    origin: &SeriesOrigin<'_>,
) -> Result<Vec<RawLevel>, LevelError> {
    let groups = group_prices(prices, strategy, tolerance);
    if groups.is_empty() {
        return Err(LevelError::EmptySeries {
            timeframe: origin.timeframe.to_string(),
        });
    }

    let weight = origin.weight.max(1);
    let levels = groups
        .into_iter()
        .map(|members| {
            let touch_count = members.len();
            RawLevel {
                price: representative_price(&members),
                kind,
                touch_count,
                timeframe: origin.timeframe.to_string(),
                weight,
                weighted_touches: touch_count * weight as usize,
                member_prices: members,
            }
        })
        .collect();

    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const HIGHS: [f64; 4] = [100.00, 100.01, 100.02, 105.00];

    fn origin() -> SeriesOrigin<'static> {
        SeriesOrigin {
            timeframe: "1D",
            weight: 3,
        }
    }

    #[test]
    fn conservative_groups_tight_run() {
        let tolerance = ToleranceModel::per_level(0.02).unwrap();
        let levels = cluster(
            &HIGHS,
            LevelKind::Resistance,
            GroupingStrategy::Conservative,
            &tolerance,
            &origin(),
        )
        .unwrap();

        assert_eq!(levels.len(), 2);
        assert_relative_eq!(levels[0].price, 100.01);
        assert_eq!(levels[0].touch_count, 3);
        assert_eq!(levels[0].weighted_touches, 9);
        assert_relative_eq!(levels[1].price, 105.00);
        assert_eq!(levels[1].touch_count, 1);
        assert!(levels.iter().all(|l| l.kind == LevelKind::Resistance));
    }

    #[test]
    fn aggressive_matches_conservative_on_tight_run() {
        let tolerance = ToleranceModel::per_level(0.02).unwrap();
        let conservative = group_prices(&HIGHS, GroupingStrategy::Conservative, &tolerance);
        let aggressive = group_prices(&HIGHS, GroupingStrategy::Aggressive, &tolerance);
        assert_eq!(conservative, aggressive);
    }

    #[test]
    fn strategies_diverge_on_chained_prices() {
        // Each step is within 1.0 of its neighbour but the chain drifts from the centroid.
        let prices = [10.0, 11.0, 12.0, 13.0];
        let tolerance = ToleranceModel::fixed_reference(10.0, 10.0).unwrap();

        let conservative = group_prices(&prices, GroupingStrategy::Conservative, &tolerance);
        assert_eq!(conservative, vec![vec![10.0, 11.0, 12.0, 13.0]]);

        let aggressive = group_prices(&prices, GroupingStrategy::Aggressive, &tolerance);
        assert_eq!(aggressive, vec![vec![10.0, 11.0], vec![12.0, 13.0]]);
    }

    #[test]
    fn unsorted_input_and_missing_values() {
        let prices = [105.0, f64::NAN, 100.0, 100.5];
        let tolerance = ToleranceModel::fixed_reference(1.0, 100.0).unwrap();
        let groups = group_prices(&prices, GroupingStrategy::Conservative, &tolerance);
        assert_eq!(groups, vec![vec![100.0, 100.5], vec![105.0]]);
    }

    #[test]
    fn representative_uses_median_from_three_members() {
        assert_relative_eq!(representative_price(&[1.0, 2.0, 9.0]), 2.0);
        assert_relative_eq!(representative_price(&[1.0, 2.0]), 1.5);
        assert_relative_eq!(representative_price(&[4.0]), 4.0);
    }

    #[test]
    fn single_member_groups_are_kept() {
        let tolerance = ToleranceModel::per_level(0.01).unwrap();
        let levels = cluster(
            &[10.0, 20.0, 30.0],
            LevelKind::Support,
            GroupingStrategy::Conservative,
            &tolerance,
            &origin(),
        )
        .unwrap();
        assert_eq!(levels.len(), 3);
        assert!(levels.iter().all(|l| l.touch_count == 1));
    }

    #[test]
    fn empty_input_is_empty_series() {
        let tolerance = ToleranceModel::per_level(1.0).unwrap();
        let err = cluster(
            &[f64::NAN],
            LevelKind::Support,
            GroupingStrategy::Aggressive,
            &tolerance,
            &origin(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LevelError::EmptySeries {
                timeframe: "1D".to_string()
            }
        );
    }
}
