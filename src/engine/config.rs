//! Retry engine configuration.

use crate::errors::ConfigurationError;
use crate::types::{
    Delay, DelayRange, DurationUnit, DurationUnitError, RetryStrategy, RetryStrategyError,
};
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_FIXED_DELAY: f64 = 5.0;
const DEFAULT_RANDOM_DELAY_MIN: f64 = 3.0;
const DEFAULT_RANDOM_DELAY_MAX: f64 = 10.0;
const DEFAULT_DELAY_UNIT: DurationUnit = DurationUnit::Seconds;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_NAME: &str = "retry";

/// Validated, immutable configuration of one retry engine.
///
/// Build it with [`RetryConfig::builder`], from a raw attribute bag with
/// [`RetryConfig::try_from`], or from JSON with [`RetryConfig::from_json`].
/// Every constructor validates; an invalid configuration never yields a
/// `RetryConfig`.
///
/// ```rust
/// use retry_relay::{DurationUnit, RetryConfig, RetryStrategy};
///
/// let config = RetryConfig::builder()
///     .strategy(RetryStrategy::RandomDelay)
///     .random_delay(200.0, 400.0, DurationUnit::Milliseconds)
///     .max_attempts(5)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.max_attempts(), 5);
/// assert!(config.raise_error_on_exhaustion());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    name: Option<String>,
    strategy: RetryStrategy,
    fixed_delay: Delay,
    random_delay: DelayRange,
    max_attempts: u32,
    raise_error_on_exhaustion: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            name: None,
            strategy: RetryStrategy::default(),
            fixed_delay: Delay::new(DEFAULT_FIXED_DELAY, DEFAULT_DELAY_UNIT),
            random_delay: DelayRange::new(
                DEFAULT_RANDOM_DELAY_MIN,
                DEFAULT_RANDOM_DELAY_MAX,
                DEFAULT_DELAY_UNIT,
            ),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            raise_error_on_exhaustion: true,
        }
    }
}

impl RetryConfig {
    /// Create a new builder starting from the defaults.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// Parse and validate a JSON attribute bag.
    ///
    /// Unknown keys are ignored, missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let raw: RawRetryConfig = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    /// Optional engine name used in logs.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Engine name, falling back to `"retry"`.
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or(DEFAULT_NAME)
    }

    /// Delay strategy.
    pub fn strategy(&self) -> RetryStrategy {
        self.strategy
    }

    /// Delay used by the fixed strategy.
    pub fn fixed_delay(&self) -> Delay {
        self.fixed_delay
    }

    /// Bounds used by the random strategy.
    pub fn random_delay(&self) -> DelayRange {
        self.random_delay
    }

    /// Retry budget per success/failure cycle.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether exhaustion is surfaced as a terminal failure.
    pub fn raise_error_on_exhaustion(&self) -> bool {
        self.raise_error_on_exhaustion
    }
}

/// Builder for [`RetryConfig`].
///
/// Provides a fluent API; [`build`](RetryConfigBuilder::build) validates.
#[derive(Debug, Clone)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }
}

impl RetryConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine name used in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    /// Set the delay strategy.
    ///
    /// Default: fixed delay
    pub fn strategy(mut self, strategy: RetryStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Set the fixed delay.
    ///
    /// Default: 5 seconds
    pub fn fixed_delay(mut self, magnitude: f64, unit: DurationUnit) -> Self {
        self.config.fixed_delay = Delay::new(magnitude, unit);
        self
    }

    /// Set the random delay bounds (inclusive) and their shared unit.
    ///
    /// Default: 3 to 10 seconds
    pub fn random_delay(mut self, min: f64, max: f64, unit: DurationUnit) -> Self {
        self.config.random_delay = DelayRange::new(min, max, unit);
        self
    }

    /// Set the retry budget.
    ///
    /// Default: 3
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.max_attempts = max_attempts;
        self
    }

    /// Set whether exhaustion raises a terminal failure.
    ///
    /// Default: true
    pub fn raise_error_on_exhaustion(mut self, raise: bool) -> Self {
        self.config.raise_error_on_exhaustion = raise;
        self
    }

    /// Validate and build the configuration.
    ///
    /// Every delay must stay finite once converted to milliseconds, and so
    /// must the width of the random range. Delays of zero or less are valid
    /// and forward synchronously.
    pub fn build(self) -> Result<RetryConfig, ConfigurationError> {
        let config = self.config;

        let fixed = config.fixed_delay;
        let random = config.random_delay;
        check_delay("fixedDelay", fixed.magnitude, fixed.as_millis_f64())?;
        check_delay("randomDelayMin", random.min, random.min_millis())?;
        check_delay("randomDelayMax", random.max, random.max_millis())?;
        if random.min > random.max {
            return Err(ConfigurationError::InvertedRandomDelay {
                min: random.min,
                max: random.max,
            });
        }
        if !(random.max_millis() - random.min_millis()).is_finite() {
            return Err(ConfigurationError::InvalidNumber {
                field: "randomDelayMax",
                value: random.max.to_string(),
            });
        }
        if config.max_attempts < 1 {
            return Err(ConfigurationError::InvalidMaxAttempts(
                config.max_attempts.to_string(),
            ));
        }

        Ok(config)
    }
}

/// Reject a delay that is not finite in its own unit or in milliseconds.
fn check_delay(
    field: &'static str,
    magnitude: f64,
    millis: f64,
) -> Result<(), ConfigurationError> {
    if magnitude.is_finite() && millis.is_finite() {
        return Ok(());
    }
    Err(ConfigurationError::InvalidNumber {
        field,
        value: magnitude.to_string(),
    })
}

// =============================================================================
// Raw attribute bag
// =============================================================================

/// Unvalidated configuration as delivered by a host (e.g. a flow editor).
///
/// Every field is optional and loosely typed: numbers may arrive as JSON
/// numbers or numeric strings, the flag as a boolean or `"true"`/`"false"`.
/// Legacy key names (`retryStrategy`, `retryAttempts`,
/// `throwAsErrorOnLimitExceeded`, ...) are accepted as aliases.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRetryConfig {
    pub name: Option<String>,
    #[serde(alias = "retryStrategy")]
    pub strategy: Option<Value>,
    #[serde(alias = "retryStrategyFixedDelay")]
    pub fixed_delay: Option<Value>,
    #[serde(alias = "retryStrategyFixedDelayUnit")]
    pub fixed_delay_unit: Option<Value>,
    #[serde(alias = "retryStrategyRandomDelayMin")]
    pub random_delay_min: Option<Value>,
    #[serde(alias = "retryStrategyRandomDelayMax")]
    pub random_delay_max: Option<Value>,
    #[serde(alias = "retryStrategyRandomDelayUnit")]
    pub random_delay_unit: Option<Value>,
    #[serde(alias = "retryAttempts")]
    pub max_attempts: Option<Value>,
    #[serde(alias = "throwAsErrorOnLimitExceeded")]
    pub raise_error_on_exhaustion: Option<Value>,
}

impl TryFrom<RawRetryConfig> for RetryConfig {
    type Error = ConfigurationError;

    fn try_from(raw: RawRetryConfig) -> Result<Self, Self::Error> {
        let defaults = RetryConfig::default();
        let mut builder = RetryConfig::builder();

        if let Some(name) = raw.name.filter(|n| !n.is_empty()) {
            builder = builder.name(name);
        }
        if let Some(value) = &raw.strategy {
            builder = builder.strategy(parse_strategy(value)?);
        }

        let fixed_delay = match &raw.fixed_delay {
            Some(value) => parse_number("fixedDelay", value)?,
            None => defaults.fixed_delay.magnitude,
        };
        let fixed_unit = match &raw.fixed_delay_unit {
            Some(value) => parse_unit("fixedDelayUnit", value)?,
            None => defaults.fixed_delay.unit,
        };
        builder = builder.fixed_delay(fixed_delay, fixed_unit);

        let random_min = match &raw.random_delay_min {
            Some(value) => parse_number("randomDelayMin", value)?,
            None => defaults.random_delay.min,
        };
        let random_max = match &raw.random_delay_max {
            Some(value) => parse_number("randomDelayMax", value)?,
            None => defaults.random_delay.max,
        };
        let random_unit = match &raw.random_delay_unit {
            Some(value) => parse_unit("randomDelayUnit", value)?,
            None => defaults.random_delay.unit,
        };
        builder = builder.random_delay(random_min, random_max, random_unit);

        if let Some(value) = &raw.max_attempts {
            builder = builder.max_attempts(parse_attempts(value)?);
        }
        if let Some(value) = &raw.raise_error_on_exhaustion {
            let raise = parse_bool("raiseErrorOnExhaustion", value)?;
            builder = builder.raise_error_on_exhaustion(raise);
        }

        builder.build()
    }
}

/// Render a raw value for error messages without JSON quoting of strings.
fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_strategy(value: &Value) -> Result<RetryStrategy, ConfigurationError> {
    match value {
        Value::String(s) => Ok(s.parse::<RetryStrategy>()?),
        other => Err(RetryStrategyError(describe(other)).into()),
    }
}

fn parse_unit(field: &'static str, value: &Value) -> Result<DurationUnit, ConfigurationError> {
    let parsed = match value {
        Value::String(s) => s.parse::<DurationUnit>(),
        other => Err(DurationUnitError(describe(other))),
    };
    parsed.map_err(|source| ConfigurationError::UnsupportedUnit { field, source })
}

fn parse_number(field: &'static str, value: &Value) -> Result<f64, ConfigurationError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .filter(|n| n.is_finite())
        .ok_or_else(|| ConfigurationError::InvalidNumber {
            field,
            value: describe(value),
        })
}

fn parse_attempts(value: &Value) -> Result<u32, ConfigurationError> {
    let invalid = || ConfigurationError::InvalidMaxAttempts(describe(value));
    let number = parse_number("maxAttempts", value).map_err(|_| invalid())?;
    if number < 1.0 || number.fract() != 0.0 || number > f64::from(u32::MAX) {
        return Err(invalid());
    }
    Ok(number as u32)
}

fn parse_bool(field: &'static str, value: &Value) -> Result<bool, ConfigurationError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.trim() == "true" => Ok(true),
        Value::String(s) if s.trim() == "false" => Ok(false),
        other => Err(ConfigurationError::InvalidBoolean {
            field,
            value: describe(other),
        }),
    }
}
