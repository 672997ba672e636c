//! Configuration error type.

use crate::types::{DurationUnitError, RetryStrategyError};
use thiserror::Error;

/// Raised when a retry configuration is incorrect or inconsistent.
///
/// A configuration error is fatal: no engine is built from the rejected
/// configuration and no message is ever processed for it.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The strategy is not one of `immediate`, `fixed_delay`, `random_delay`.
    #[error(transparent)]
    UnsupportedStrategy(#[from] RetryStrategyError),

    /// A delay unit is not one of `ms`, `sec`, `min`, `h`.
    #[error("{field}: {source}")]
    UnsupportedUnit {
        field: &'static str,
        #[source]
        source: DurationUnitError,
    },

    /// A numeric field is not a real, finite number (also in milliseconds).
    #[error("{field} must be a finite number, got {value}")]
    InvalidNumber { field: &'static str, value: String },

    /// The random delay lower bound exceeds the upper bound.
    #[error("random delay minimum ({min}) exceeds maximum ({max})")]
    InvertedRandomDelay { min: f64, max: f64 },

    /// The retry budget is not an integer of at least 1.
    #[error("max attempts must be an integer of at least 1, got {0}")]
    InvalidMaxAttempts(String),

    /// A flag is not a boolean.
    #[error("{field} must be a boolean, got {value}")]
    InvalidBoolean { field: &'static str, value: String },

    /// The raw configuration could not be parsed at all.
    #[error("failed to parse retry configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigurationError {
    /// Name of the offending field, when the error concerns a single field.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedStrategy(_) => Some("strategy"),
            Self::UnsupportedUnit { field, .. }
            | Self::InvalidNumber { field, .. }
            | Self::InvalidBoolean { field, .. } => Some(*field),
            Self::InvertedRandomDelay { .. } => Some("randomDelayMin"),
            Self::InvalidMaxAttempts(_) => Some("maxAttempts"),
            Self::Parse(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ConfigurationError::InvertedRandomDelay { min: 5.0, max: 4.0 };
        assert_eq!(
            err.to_string(),
            "random delay minimum (5) exceeds maximum (4)"
        );

        let err = ConfigurationError::InvalidNumber {
            field: "fixedDelay",
            value: "\"not_a_number\"".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "fixedDelay must be a finite number, got \"not_a_number\""
        );
        assert_eq!(err.field(), Some("fixedDelay"));
    }

    #[test]
    fn test_strategy_error_is_transparent() {
        let err: ConfigurationError = RetryStrategyError("bogus".to_string()).into();
        assert!(err.to_string().starts_with("unsupported retry strategy 'bogus'"));
        assert_eq!(err.field(), Some("strategy"));
    }
}
