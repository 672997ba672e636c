//! Core value types for retry configuration.

use crate::utils::duration;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// DurationUnit
// =============================================================================

/// Error when parsing a duration unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported duration unit '{0}' (expected one of: ms, sec, min, h)")]
pub struct DurationUnitError(pub String);

/// Unit in which delays are configured and displayed.
///
/// The textual forms are `ms`, `sec`, `min` and `h`.
///
/// # Example
///
/// ```rust
/// use retry_relay::DurationUnit;
///
/// let unit: DurationUnit = "min".parse().unwrap();
/// assert_eq!(unit, DurationUnit::Minutes);
/// assert_eq!(unit.to_milliseconds(1.5), 90_000.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl DurationUnit {
    /// All supported units, smallest first.
    pub const ALL: [DurationUnit; 4] = [
        DurationUnit::Milliseconds,
        DurationUnit::Seconds,
        DurationUnit::Minutes,
        DurationUnit::Hours,
    ];

    /// Short textual form of the unit.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Milliseconds => "ms",
            Self::Seconds => "sec",
            Self::Minutes => "min",
            Self::Hours => "h",
        }
    }

    /// Convert a magnitude in this unit to milliseconds.
    pub fn to_milliseconds(self, magnitude: f64) -> f64 {
        duration::to_milliseconds(magnitude, self)
    }

    /// Convert milliseconds to a magnitude in this unit.
    pub fn from_milliseconds(self, milliseconds: f64) -> f64 {
        duration::from_milliseconds(milliseconds, self)
    }
}

impl FromStr for DurationUnit {
    type Err = DurationUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ms" => Ok(Self::Milliseconds),
            "sec" => Ok(Self::Seconds),
            "min" => Ok(Self::Minutes),
            "h" => Ok(Self::Hours),
            other => Err(DurationUnitError(other.to_string())),
        }
    }
}

impl Display for DurationUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DurationUnit {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl Serialize for DurationUnit {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

// =============================================================================
// RetryStrategy
// =============================================================================

/// Error when parsing a retry strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "unsupported retry strategy '{0}' (expected one of: immediate, fixed_delay, random_delay)"
)]
pub struct RetryStrategyError(pub String);

/// How long the engine waits before re-sending the last good message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RetryStrategy {
    /// Re-send synchronously, without any delay.
    Immediate,
    /// Wait the configured fixed delay.
    #[default]
    FixedDelay,
    /// Wait a uniformly drawn delay between the configured bounds.
    RandomDelay,
}

impl RetryStrategy {
    /// Textual form of the strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::FixedDelay => "fixed_delay",
            Self::RandomDelay => "random_delay",
        }
    }
}

impl FromStr for RetryStrategy {
    type Err = RetryStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "immediate" => Ok(Self::Immediate),
            "fixed_delay" => Ok(Self::FixedDelay),
            "random_delay" => Ok(Self::RandomDelay),
            other => Err(RetryStrategyError(other.to_string())),
        }
    }
}

impl Display for RetryStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RetryStrategy {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl Serialize for RetryStrategy {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

// =============================================================================
// Delay
// =============================================================================

/// A delay expressed as a magnitude in a given unit (e.g. `5 sec`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Delay {
    /// Magnitude in `unit`.
    pub magnitude: f64,
    /// Unit of `magnitude`.
    pub unit: DurationUnit,
}

impl Delay {
    /// Create a new delay.
    pub fn new(magnitude: f64, unit: DurationUnit) -> Self {
        Self { magnitude, unit }
    }

    /// Delay in milliseconds.
    pub fn as_millis_f64(&self) -> f64 {
        self.unit.to_milliseconds(self.magnitude)
    }
}

impl Display for Delay {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} {}", self.magnitude, self.unit)
    }
}

/// Closed interval of delays sharing one unit, used by the random strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Lower bound (inclusive) in `unit`.
    pub min: f64,
    /// Upper bound (inclusive) in `unit`.
    pub max: f64,
    /// Unit of both bounds.
    pub unit: DurationUnit,
}

impl DelayRange {
    /// Create a new delay range. Bounds are validated by the config builder.
    pub fn new(min: f64, max: f64, unit: DurationUnit) -> Self {
        Self { min, max, unit }
    }

    /// Lower bound in milliseconds.
    pub fn min_millis(&self) -> f64 {
        self.unit.to_milliseconds(self.min)
    }

    /// Upper bound in milliseconds.
    pub fn max_millis(&self) -> f64 {
        self.unit.to_milliseconds(self.max)
    }
}

/// Convert a (non-negative) millisecond count into a [`Duration`].
///
/// Values that do not fit saturate to [`Duration::MAX`]; negative or NaN
/// values collapse to zero.
pub(crate) fn millis_to_duration(millis: f64) -> Duration {
    if millis.is_nan() || millis <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(millis / 1000.0).unwrap_or(Duration::MAX)
}
