use std::path::PathBuf;

use clap::Parser;

use crate::analysis::atr::DEFAULT_ATR_PERIOD;
use crate::analysis::clustering::GroupingStrategy;
use crate::analysis::tolerance::ToleranceMode;
use crate::analysis::weights::TimeframeWeighter;
use crate::error::LevelError;

/// Command-line configuration for the support/resistance level finder.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    /// Timeframe input as LABEL=FILE (e.g. 1D=daily.csv). Repeatable; the first is primary.
    #[arg(short = 's', long = "series", value_name = "LABEL=FILE", value_parser = parse_series_arg, required = true)]
    pub series: Vec<(String, PathBuf)>,

    /// Minimum total touches for a combined level to be reported.
    #[arg(long, default_value_t = 2)]
    pub min_touches: usize,

    /// Tolerance as a percentage (0.5 means 0.5%).
    #[arg(short = 't', long = "tolerance", default_value_t = 0.5)]
    pub tolerance_percentage: f64,

    /// Per-timeframe grouping strategy.
    #[arg(long, value_enum, default_value_t = GroupingStrategy::Conservative)]
    pub strategy: GroupingStrategy,

    /// How the tolerance distance is derived.
    #[arg(long, value_enum, default_value_t = ToleranceMode::FixedReference)]
    pub tolerance_mode: ToleranceMode,

    /// Timeframe weight override as LABEL=N. Repeatable.
    #[arg(short = 'w', long = "weight", value_name = "LABEL=N", value_parser = parse_weight_arg)]
    pub weights: Vec<(String, u32)>,

    /// ATR window for volatility-based tolerance.
    #[arg(long, default_value_t = DEFAULT_ATR_PERIOD)]
    pub atr_period: usize,

    /// Explicit ATR value, bypassing the computed one.
    #[arg(long = "atr", value_name = "VALUE")]
    pub atr_override: Option<f64>,

    /// Reference price for fixed-reference tolerance (defaults to the primary series' last close).
    #[arg(long)]
    pub reference_price: Option<f64>,

    /// Lower bound of a price range to diagnose.
    #[arg(long, requires = "range_end", allow_hyphen_values = true)]
    pub range_start: Option<f64>,

    /// Upper bound of a price range to diagnose.
    #[arg(long, requires = "range_start", allow_hyphen_values = true)]
    pub range_end: Option<f64>,

    /// Maximum number of levels to display.
    #[arg(long)]
    pub max_levels: Option<usize>,

    /// Emit the report as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

impl AppConfig {
    pub fn analysis_config(&self) -> Result<AnalysisConfig, LevelError> {
        let weights = TimeframeWeighter::default()
            .with_overrides(self.weights.iter().map(|(label, w)| (label.as_str(), *w)))?;
        let config = AnalysisConfig {
            min_touches: self.min_touches,
            tolerance_percentage: self.tolerance_percentage,
            strategy: self.strategy,
            tolerance_mode: self.tolerance_mode,
            weights,
            atr_period: self.atr_period,
            atr_override: self.atr_override,
            reference_price_override: self.reference_price,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn diagnostic_range(&self) -> Option<(f64, f64)> {
        self.range_start.zip(self.range_end)
    }
}

/// Parameters for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub min_touches: usize,
    pub tolerance_percentage: f64,
    pub strategy: GroupingStrategy,
    pub tolerance_mode: ToleranceMode,
    pub weights: TimeframeWeighter,
    pub atr_period: usize,
    pub atr_override: Option<f64>,
    pub reference_price_override: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_touches: 2,
            tolerance_percentage: 0.5,
            strategy: GroupingStrategy::Conservative,
            tolerance_mode: ToleranceMode::FixedReference,
            weights: TimeframeWeighter::default(),
            atr_period: DEFAULT_ATR_PERIOD,
            atr_override: None,
            reference_price_override: None,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), LevelError> {
        if self.min_touches < 1 {
            return Err(LevelError::invalid("min touches must be at least 1"));
        }
        let pct = self.tolerance_percentage;
        if !pct.is_finite() || pct <= 0.0 || pct >= 100.0 {
            return Err(LevelError::invalid(format!(
                "tolerance percentage must be within (0, 100), got {pct}"
            )));
        }
        if self.atr_period == 0 {
            return Err(LevelError::invalid("ATR period must be at least 1"));
        }
        if let Some(atr) = self.atr_override {
            if !atr.is_finite() || atr <= 0.0 {
                return Err(LevelError::invalid(format!("ATR must be positive, got {atr}")));
            }
        }
        if let Some(price) = self.reference_price_override {
            if !price.is_finite() || price <= 0.0 {
                return Err(LevelError::invalid(format!(
                    "reference price must be positive, got {price}"
                )));
            }
        }
        Ok(())
    }
}

fn split_pair(value: &str) -> Result<(&str, &str), String> {
    let (label, rest) = value
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=VALUE, got '{value}'"))?;
    let label = label.trim();
    if label.is_empty() {
        return Err(format!("missing timeframe label in '{value}'"));
    }
    Ok((label, rest.trim()))
}

fn parse_series_arg(value: &str) -> Result<(String, PathBuf), String> {
    let (label, path) = split_pair(value)?;
    if path.is_empty() {
        return Err(format!("missing file path in '{value}'"));
    }
    Ok((label.to_string(), PathBuf::from(path)))
}

fn parse_weight_arg(value: &str) -> Result<(String, u32), String> {
    let (label, weight) = split_pair(value)?;
    let weight = weight
        .parse::<u32>()
        .map_err(|_| format!("invalid weight '{weight}' for timeframe '{label}'"))?;
    Ok((label.to_string(), weight))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cli_pairs() {
        let config = AppConfig::try_parse_from([
            "sr-levels",
            "--series",
            "1D=daily.csv",
            "-s",
            "1H=hourly.csv",
            "--weight",
            "1H=2",
            "--strategy",
            "aggressive",
            "--tolerance-mode",
            "per-level",
            "--tolerance",
            "0.25",
        ])
        .unwrap();

        assert_eq!(config.series.len(), 2);
        assert_eq!(config.series[0], ("1D".to_string(), PathBuf::from("daily.csv")));
        assert_eq!(config.weights, vec![("1H".to_string(), 2)]);
        assert_eq!(config.strategy, GroupingStrategy::Aggressive);
        assert_eq!(config.tolerance_mode, ToleranceMode::PerLevel);

        let analysis = config.analysis_config().unwrap();
        assert_eq!(analysis.weights.weight_for("1H"), 2);
        assert_eq!(analysis.weights.weight_for("1D"), 3);
    }

    #[test]
    fn rejects_malformed_pairs() {
        assert!(parse_series_arg("daily.csv").is_err());
        assert!(parse_series_arg("=daily.csv").is_err());
        assert!(parse_weight_arg("1D=heavy").is_err());
    }

    #[test]
    fn validation_fails_fast() {
        let base = AnalysisConfig::default();
        assert!(base.validate().is_ok());

        let zero_touches = AnalysisConfig {
            min_touches: 0,
            ..base.clone()
        };
        assert!(zero_touches.validate().is_err());

        let bad_pct = AnalysisConfig {
            tolerance_percentage: 0.0,
            ..base.clone()
        };
        assert!(bad_pct.validate().is_err());

        let bad_atr = AnalysisConfig {
            atr_override: Some(-1.0),
            ..base
        };
        assert!(matches!(
            bad_atr.validate(),
            Err(LevelError::InvalidConfiguration { .. })
        ));
    }
}
