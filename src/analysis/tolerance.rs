use clap::ValueEnum;
use serde::Serialize;

use crate::error::LevelError;

/// How the same-level distance threshold is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
pub enum ToleranceMode {
    /// Percentage of one reference price (normally the current price).
    FixedReference,
    /// Percentage of the price being evaluated.
    PerLevel,
    /// Percentage of the Average True Range.
    #[value(aliases = ["volatility-based", "atr"])]
    Volatility,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToleranceConfig {
    pub mode: ToleranceMode,
    pub percentage: f64,
    pub reference_price: Option<f64>,
    pub atr_value: Option<f64>,
}

/// Validated tolerance threshold source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToleranceModel {
    mode: ToleranceMode,
    fraction: f64,
    base: f64,
}

impl ToleranceModel {
    pub fn new(config: ToleranceConfig) -> Result<Self, LevelError> {
        let percentage = config.percentage;
        if !percentage.is_finite() || percentage <= 0.0 {
            return Err(LevelError::invalid(format!(
                "tolerance percentage must be positive, got {percentage}"
            )));
        }

        let base = match config.mode {
            ToleranceMode::FixedReference => {
                positive(config.reference_price, "reference price", config.mode)?
            }
            ToleranceMode::Volatility => positive(config.atr_value, "ATR value", config.mode)?,
            // Scaled by the evaluated price on every call.
            ToleranceMode::PerLevel => 1.0,
        };

        Ok(Self {
            mode: config.mode,
            fraction: percentage / 100.0,
            base,
        })
    }

    pub fn fixed_reference(percentage: f64, reference_price: f64) -> Result<Self, LevelError> {
        Self::new(ToleranceConfig {
            mode: ToleranceMode::FixedReference,
            percentage,
            reference_price: Some(reference_price),
            atr_value: None,
        })
    }

    pub fn per_level(percentage: f64) -> Result<Self, LevelError> {
        Self::new(ToleranceConfig {
            mode: ToleranceMode::PerLevel,
            percentage,
            reference_price: None,
            atr_value: None,
        })
    }

    pub fn volatility(percentage: f64, atr_value: f64) -> Result<Self, LevelError> {
        Self::new(ToleranceConfig {
            mode: ToleranceMode::Volatility,
            percentage,
            reference_price: None,
            atr_value: Some(atr_value),
        })
    }

    pub fn mode(&self) -> ToleranceMode {
        self.mode
    }

    pub fn percentage(&self) -> f64 {
        self.fraction * 100.0
    }

    /// Maximum distance at which a price is considered part of a level at `reference_value`.
    ///
    /// Only `PerLevel` looks at `reference_value`; the other modes return a constant.
    pub fn tolerance_for(&self, reference_value: f64) -> f64 {
        match self.mode {
            ToleranceMode::PerLevel => reference_value.abs() * self.fraction,
            ToleranceMode::FixedReference | ToleranceMode::Volatility => self.base * self.fraction,
        }
    }

    /// Constant threshold for the fixed modes, `None` for `PerLevel`.
    pub fn fixed_threshold(&self) -> Option<f64> {
        match self.mode {
            ToleranceMode::PerLevel => None,
            _ => Some(self.base * self.fraction),
        }
    }
}

fn positive(value: Option<f64>, what: &str, mode: ToleranceMode) -> Result<f64, LevelError> {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        Some(v) => Err(LevelError::invalid(format!(
            "{what} must be positive for {mode:?} tolerance, got {v}"
        ))),
        None => Err(LevelError::invalid(format!(
            "{what} is required for {mode:?} tolerance"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fixed_reference_ignores_evaluated_price() {
        let model = ToleranceModel::fixed_reference(0.5, 200.0).unwrap();
        assert_relative_eq!(model.tolerance_for(10.0), 1.0);
        assert_relative_eq!(model.tolerance_for(10_000.0), 1.0);
        assert_relative_eq!(model.fixed_threshold().unwrap(), 1.0);
    }

    #[test]
    fn per_level_scales_with_price() {
        let model = ToleranceModel::per_level(1.0).unwrap();
        assert_relative_eq!(model.tolerance_for(100.0), 1.0);
        assert_relative_eq!(model.tolerance_for(250.0), 2.5);
        assert_eq!(model.fixed_threshold(), None);
    }

    #[test]
    fn volatility_uses_atr() {
        let model = ToleranceModel::volatility(50.0, 4.0).unwrap();
        assert_relative_eq!(model.tolerance_for(1.0), 2.0);
        assert_relative_eq!(model.tolerance_for(1e6), 2.0);
    }

    #[test]
    fn rejects_non_positive_percentage() {
        assert!(matches!(
            ToleranceModel::per_level(0.0),
            Err(LevelError::InvalidConfiguration { .. })
        ));
        assert!(ToleranceModel::per_level(-1.0).is_err());
        assert!(ToleranceModel::per_level(f64::NAN).is_err());
    }

    #[test]
    fn rejects_missing_mode_reference() {
        let missing_reference = ToleranceModel::new(ToleranceConfig {
            mode: ToleranceMode::FixedReference,
            percentage: 1.0,
            reference_price: None,
            atr_value: Some(3.0),
        });
        assert!(missing_reference.is_err());

        assert!(ToleranceModel::volatility(1.0, 0.0).is_err());
        assert!(ToleranceModel::fixed_reference(1.0, -5.0).is_err());
    }
}
