use std::collections::HashMap;

use serde::Serialize;

use crate::error::LevelError;

const DEFAULT_WEIGHTS: [(&str, u32); 3] = [("1D", 3), ("4H", 2), ("1H", 1)];

/// Importance of each timeframe when merging levels; coarser bars weigh more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeframeWeighter {
    weights: HashMap<String, u32>,
    fallback: u32,
}

impl Default for TimeframeWeighter {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS
                .iter()
                .map(|(label, weight)| (normalize(label), *weight))
                .collect(),
            fallback: 1,
        }
    }
}

impl TimeframeWeighter {
    /// Weighter with no built-in table: every label gets weight 1 unless overridden.
    pub fn empty() -> Self {
        Self {
            weights: HashMap::new(),
            fallback: 1,
        }
    }

    /// Replace or add weights on top of the current table.
    pub fn with_overrides<I, S>(mut self, overrides: I) -> Result<Self, LevelError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        for (label, weight) in overrides {
            let label = label.as_ref();
            if weight == 0 {
                return Err(LevelError::invalid(format!(
                    "weight for timeframe '{label}' must be at least 1"
                )));
            }
            self.weights.insert(normalize(label), weight);
        }
        Ok(self)
    }

    pub fn weight_for(&self, timeframe: &str) -> u32 {
        self.weights
            .get(&normalize(timeframe))
            .copied()
            .unwrap_or(self.fallback)
    }
}

fn normalize(label: &str) -> String {
    label.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table() {
        let weighter = TimeframeWeighter::default();
        assert_eq!(weighter.weight_for("1D"), 3);
        assert_eq!(weighter.weight_for("4H"), 2);
        assert_eq!(weighter.weight_for("1H"), 1);
        assert_eq!(weighter.weight_for("1d"), 3);
    }

    #[test]
    fn unknown_labels_weigh_one() {
        let weighter = TimeframeWeighter::default();
        assert_eq!(weighter.weight_for("15M"), 1);
        assert_eq!(weighter.weight_for(""), 1);
    }

    #[test]
    fn overrides_replace_and_extend() {
        let weighter = TimeframeWeighter::default()
            .with_overrides([("1W", 5), ("1h", 2)])
            .unwrap();
        assert_eq!(weighter.weight_for("1W"), 5);
        assert_eq!(weighter.weight_for("1H"), 2);
        assert_eq!(weighter.weight_for("1D"), 3);
    }

    #[test]
    fn zero_weight_is_rejected() {
        let result = TimeframeWeighter::empty().with_overrides([("1D", 0)]);
        assert!(matches!(
            result,
            Err(LevelError::InvalidConfiguration { .. })
        ));
    }
}
