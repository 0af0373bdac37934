use thiserror::Error;

/// Errors raised by the level-detection engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LevelError {
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("timeframe '{timeframe}' has no usable price observations")]
    EmptySeries { timeframe: String },
}

impl LevelError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        LevelError::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
