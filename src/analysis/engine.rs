use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::atr::max_latest_atr;
use crate::analysis::clustering::{cluster, GroupingStrategy, SeriesOrigin};
use crate::analysis::combine::combine;
use crate::analysis::diagnostics::{diagnose, RangeDiagnostics};
use crate::analysis::tolerance::{ToleranceConfig, ToleranceMode, ToleranceModel};
use crate::config::AnalysisConfig;
use crate::data::{CombinedLevel, LevelKind, PriceSeries, RawLevel};
use crate::error::LevelError;

/// Tolerance settings actually used for a run.
#[derive(Debug, Clone, Serialize)]
pub struct ToleranceSummary {
    pub mode: ToleranceMode,
    pub percentage: f64,
    pub strategy: GroupingStrategy,
    /// Distance threshold when it does not depend on the evaluated price.
    pub absolute: Option<f64>,
    pub reference_price: Option<f64>,
    pub atr: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub current_price: Option<f64>,
    pub tolerance: ToleranceSummary,
    pub min_touches: usize,
    pub raw_level_count: usize,
    pub levels: Vec<CombinedLevel>,
    pub skipped_timeframes: Vec<String>,
}

impl AnalysisReport {
    /// Level prices as a comma-separated list with two decimals, for charting tools.
    pub fn chart_string(&self) -> String {
        chart_string(&self.levels)
    }

    pub fn diagnose(&self, series: &[PriceSeries], start: f64, end: f64) -> RangeDiagnostics {
        diagnose(series, start, end)
    }
}

pub fn chart_string(levels: &[CombinedLevel]) -> String {
    levels
        .iter()
        .map(|level| format!("{:.2}", level.price))
        .collect::<Vec<_>>()
        .join(",")
}

/// Build the tolerance model for `series` under `config`.
///
/// The fixed reference defaults to the last close of the first series that has one;
/// the volatility reference defaults to the highest latest ATR across all series.
pub fn resolve_tolerance(
    series: &[PriceSeries],
    config: &AnalysisConfig,
) -> Result<(ToleranceModel, ToleranceSummary, Option<f64>), LevelError> {
    let current_price = series.iter().find_map(PriceSeries::last_close);

    let reference_price = match config.tolerance_mode {
        ToleranceMode::FixedReference => config.reference_price_override.or(current_price),
        _ => None,
    };
    let atr = match config.tolerance_mode {
        ToleranceMode::Volatility => config
            .atr_override
            .or_else(|| max_latest_atr(series, config.atr_period)),
        _ => None,
    };

    let model = ToleranceModel::new(ToleranceConfig {
        mode: config.tolerance_mode,
        percentage: config.tolerance_percentage,
        reference_price,
        atr_value: atr,
    })?;

    let summary = ToleranceSummary {
        mode: model.mode(),
        percentage: model.percentage(),
        strategy: config.strategy,
        absolute: model.fixed_threshold(),
        reference_price,
        atr,
    };
    Ok((model, summary, current_price))
}

/// Cluster every series into raw levels; series without observations are skipped.
pub fn raw_levels(
    series: &[PriceSeries],
    config: &AnalysisConfig,
    tolerance: &ToleranceModel,
) -> (Vec<RawLevel>, Vec<String>) {
    let mut levels = Vec::new();
    let mut skipped = Vec::new();

    for s in series {
        let origin = SeriesOrigin {
            timeframe: &s.timeframe,
            weight: config.weights.weight_for(&s.timeframe),
        };

        let mut produced = 0usize;
        for kind in LevelKind::ALL {
            match cluster(&s.observations(kind), kind, config.strategy, tolerance, &origin) {
                Ok(found) => {
                    produced += found.len();
                    levels.extend(found);
                }
                Err(err) => {
                    debug!(timeframe = %s.timeframe, kind = kind.label(), error = %err, "no raw levels");
                }
            }
        }

        if produced == 0 {
            warn!(timeframe = %s.timeframe, "timeframe has no usable observations; skipping");
            skipped.push(s.timeframe.clone());
        } else {
            debug!(
                timeframe = %s.timeframe,
                weight = origin.weight,
                raw_levels = produced,
                "clustered series"
            );
        }
    }

    (levels, skipped)
}

/// Run the full detection pipeline for one request.
pub fn analyze(series: &[PriceSeries], config: &AnalysisConfig) -> Result<AnalysisReport, LevelError> {
    config.validate()?;
    let (tolerance, summary, current_price) = resolve_tolerance(series, config)?;

    let (raw, skipped_timeframes) = raw_levels(series, config, &tolerance);
    let levels = combine(&raw, &tolerance, config.min_touches);

    info!(
        timeframes = series.len(),
        skipped = skipped_timeframes.len(),
        raw_levels = raw.len(),
        levels = levels.len(),
        "level analysis complete"
    );

    Ok(AnalysisReport {
        current_price,
        tolerance: summary,
        min_touches: config.min_touches,
        raw_level_count: raw.len(),
        levels,
        skipped_timeframes,
    })
}
