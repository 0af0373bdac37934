use std::cmp::Ordering;

use itertools::Itertools;

use crate::analysis::tolerance::ToleranceModel;
use crate::data::{CombinedLevel, LevelKind, RawLevel};

/// Merge raw levels from every timeframe into ranked combined levels.
///
/// Raw levels are scanned in ascending price order; a level joins the open group when
/// it lies within tolerance of any member already in it. Groups with fewer than
/// `min_touches` total touches are dropped. The result is ordered by timeframe count,
/// then total weighted touches, both descending.
pub fn combine(
    raw_levels: &[RawLevel],
    tolerance: &ToleranceModel,
    min_touches: usize,
) -> Vec<CombinedLevel> {
    let mut levels: Vec<CombinedLevel> = group_raw_levels(raw_levels, tolerance)
        .into_iter()
        .filter_map(|members| reduce_group(members, min_touches))
        .collect();

    levels.sort_by(|a, b| {
        b.timeframe_count
            .cmp(&a.timeframe_count)
            .then_with(|| b.total_weighted_touches.cmp(&a.total_weighted_touches))
    });
    levels
}

/// Partition raw levels into price-proximity groups without any touch filtering.
pub fn group_raw_levels(raw_levels: &[RawLevel], tolerance: &ToleranceModel) -> Vec<Vec<RawLevel>> {
    let mut sorted: Vec<&RawLevel> = raw_levels.iter().filter(|l| l.price.is_finite()).collect();
    sorted.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal));

    let mut groups = Vec::new();
    let mut buffer: Vec<RawLevel> = Vec::new();

    for level in sorted {
        let threshold = tolerance.tolerance_for(level.price);
        let admitted = buffer
            .iter()
            .any(|member| (level.price - member.price).abs() <= threshold);

        if buffer.is_empty() || admitted {
            buffer.push(level.clone());
        } else {
            groups.push(std::mem::take(&mut buffer));
            buffer.push(level.clone());
        }
    }
    if !buffer.is_empty() {
        groups.push(buffer);
    }

    groups
}

fn reduce_group(members: Vec<RawLevel>, min_touches: usize) -> Option<CombinedLevel> {
    let total_touches: usize = members.iter().map(|l| l.touch_count).sum();
    if members.is_empty() || total_touches < min_touches {
        return None;
    }

    let total_weighted_touches: usize = members.iter().map(|l| l.weighted_touches).sum();
    let price = if total_weighted_touches > 0 {
        members
            .iter()
            .map(|l| l.price * l.weighted_touches as f64)
            .sum::<f64>()
            / total_weighted_touches as f64
    } else {
        members.iter().map(|l| l.price).sum::<f64>() / members.len() as f64
    };

    let timeframes_involved: Vec<String> = members
        .iter()
        .map(|l| l.timeframe.clone())
        .unique()
        .collect();

    Some(CombinedLevel {
        price,
        kind: majority_kind(&members),
        total_touches,
        total_weighted_touches,
        timeframe_count: timeframes_involved.len(),
        timeframes_involved,
        members,
    })
}

/// Most frequent kind among members; a tie goes to the kind seen first in scan order.
fn majority_kind(members: &[RawLevel]) -> LevelKind {
    let supports = members
        .iter()
        .filter(|l| l.kind == LevelKind::Support)
        .count();
    let resistances = members.len() - supports;

    match supports.cmp(&resistances) {
        Ordering::Greater => LevelKind::Support,
        Ordering::Less => LevelKind::Resistance,
        Ordering::Equal => members
            .first()
            .map(|l| l.kind)
            .unwrap_or(LevelKind::Support),
    }
}
