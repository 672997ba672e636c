//! Delay computation for scheduled retries.

use crate::engine::RetryConfig;
use crate::types::{Delay, DelayRange, DurationUnit, RetryStrategy, millis_to_duration};
use rand::Rng;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

/// Delay chosen for one retry attempt.
///
/// Carries both the scheduling value (milliseconds) and the magnitude/unit
/// pair used when the delay is shown in a status line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComputedDelay {
    /// Delay in milliseconds.
    pub millis: f64,
    /// Delay expressed in `unit`, for display.
    pub magnitude: f64,
    /// Display unit.
    pub unit: DurationUnit,
}

impl ComputedDelay {
    /// The zero delay used by the immediate strategy.
    pub fn immediate() -> Self {
        Self {
            millis: 0.0,
            magnitude: 0.0,
            unit: DurationUnit::Milliseconds,
        }
    }

    /// Whether the retry should be forwarded synchronously.
    pub fn is_immediate(&self) -> bool {
        self.millis <= 0.0
    }

    /// Delay as a [`Duration`] for the timer.
    pub fn as_duration(&self) -> Duration {
        millis_to_duration(self.millis)
    }
}

impl Display for ComputedDelay {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} {}", self.magnitude, self.unit)
    }
}

/// Computes the delay before each retry from a validated [`RetryConfig`].
///
/// ```rust
/// use retry_relay::{DelayPolicy, DurationUnit, RetryConfig, RetryStrategy};
///
/// let config = RetryConfig::builder()
///     .strategy(RetryStrategy::FixedDelay)
///     .fixed_delay(0.6, DurationUnit::Seconds)
///     .build()
///     .unwrap();
///
/// let delay = DelayPolicy::new(&config).compute_delay();
/// assert_eq!(delay.millis, 600.0);
/// assert_eq!(delay.to_string(), "0.6 sec");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayPolicy {
    strategy: RetryStrategy,
    fixed_delay: Delay,
    random_delay: DelayRange,
}

impl DelayPolicy {
    /// Build the policy for the given configuration.
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            strategy: config.strategy(),
            fixed_delay: config.fixed_delay(),
            random_delay: config.random_delay(),
        }
    }

    /// Strategy this policy applies.
    pub fn strategy(&self) -> RetryStrategy {
        self.strategy
    }

    /// Compute the delay for the next attempt using the thread-local RNG.
    ///
    /// Call once per scheduled attempt: the random strategy draws a fresh
    /// value on every call.
    pub fn compute_delay(&self) -> ComputedDelay {
        self.compute_delay_with(&mut rand::thread_rng())
    }

    /// Compute the delay for the next attempt with a caller-provided RNG.
    pub fn compute_delay_with<R: Rng + ?Sized>(&self, rng: &mut R) -> ComputedDelay {
        match self.strategy {
            RetryStrategy::Immediate => ComputedDelay::immediate(),
            RetryStrategy::FixedDelay => ComputedDelay {
                millis: self.fixed_delay.as_millis_f64(),
                magnitude: self.fixed_delay.magnitude,
                unit: self.fixed_delay.unit,
            },
            RetryStrategy::RandomDelay => {
                let min = self.random_delay.min_millis();
                let max = self.random_delay.max_millis();
                // gen_range panics on a non-finite span
                let drawn = if max > min && (max - min).is_finite() {
                    rng.gen_range(min..=max)
                } else {
                    min
                };
                let millis = drawn.round();
                let unit = self.random_delay.unit;
                ComputedDelay {
                    millis,
                    magnitude: unit.from_milliseconds(millis),
                    unit,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn policy(builder: crate::engine::RetryConfigBuilder) -> DelayPolicy {
        DelayPolicy::new(&builder.build().unwrap())
    }

    #[test]
    fn test_immediate_is_zero() {
        let policy = policy(RetryConfig::builder().strategy(RetryStrategy::Immediate));
        let delay = policy.compute_delay();
        assert_eq!(delay, ComputedDelay::immediate());
        assert!(delay.is_immediate());
        assert_eq!(delay.as_duration(), Duration::ZERO);
    }

    #[test]
    fn test_fixed_delay_keeps_configured_unit() {
        let policy = policy(
            RetryConfig::builder()
                .strategy(RetryStrategy::FixedDelay)
                .fixed_delay(2.0, DurationUnit::Minutes),
        );
        let delay = policy.compute_delay();
        assert_eq!(delay.millis, 120_000.0);
        assert_eq!(delay.magnitude, 2.0);
        assert_eq!(delay.unit, DurationUnit::Minutes);
        assert_eq!(delay.as_duration(), Duration::from_secs(120));
    }

    #[test]
    fn test_default_fixed_delay_is_five_seconds() {
        let delay = policy(RetryConfig::builder()).compute_delay();
        assert_eq!(delay.millis, 5_000.0);
        assert_eq!(delay.to_string(), "5.0 sec");
    }

    #[test]
    fn test_random_delay_stays_within_bounds() {
        let policy = policy(
            RetryConfig::builder()
                .strategy(RetryStrategy::RandomDelay)
                .random_delay(200.0, 400.0, DurationUnit::Milliseconds),
        );
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let delay = policy.compute_delay_with(&mut rng);
            assert!((200.0..=400.0).contains(&delay.millis), "{delay:?}");
            assert_eq!(delay.millis, delay.millis.round());
        }
    }

    #[test]
    fn test_random_delay_with_equal_bounds_is_deterministic() {
        let policy = policy(
            RetryConfig::builder()
                .strategy(RetryStrategy::RandomDelay)
                .random_delay(500.0, 500.0, DurationUnit::Milliseconds),
        );
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            assert_eq!(policy.compute_delay_with(&mut rng).millis, 500.0);
        }
    }

    #[test]
    fn test_random_delay_converts_back_to_unit() {
        let policy = policy(
            RetryConfig::builder()
                .strategy(RetryStrategy::RandomDelay)
                .random_delay(0.3, 0.7, DurationUnit::Seconds),
        );
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let delay = policy.compute_delay_with(&mut rng);
            assert_eq!(delay.unit, DurationUnit::Seconds);
            assert!((300.0..=700.0).contains(&delay.millis));
            assert!((delay.magnitude * 1000.0 - delay.millis).abs() < 1e-9);
        }
    }

    #[test]
    fn test_random_delay_draws_fresh_values() {
        let policy = policy(
            RetryConfig::builder()
                .strategy(RetryStrategy::RandomDelay)
                .random_delay(0.0, 10_000.0, DurationUnit::Milliseconds),
        );
        let mut rng = StdRng::seed_from_u64(11);
        let first = policy.compute_delay_with(&mut rng).millis;
        let differs = (0..20).any(|_| policy.compute_delay_with(&mut rng).millis != first);
        assert!(differs);
    }

    #[test]
    fn test_random_delay_with_overflowing_span_does_not_panic() {
        // Bypasses config validation on purpose
        let policy = DelayPolicy {
            strategy: RetryStrategy::RandomDelay,
            fixed_delay: Delay::new(0.0, DurationUnit::Seconds),
            random_delay: DelayRange::new(1.0, 1e306, DurationUnit::Hours),
        };
        let mut rng = StdRng::seed_from_u64(5);
        let delay = policy.compute_delay_with(&mut rng);
        assert_eq!(delay.millis, 3_600_000.0);
        assert_eq!(delay.unit, DurationUnit::Hours);
    }

    #[test]
    fn test_negative_fixed_delay_is_immediate() {
        let delay = policy(RetryConfig::builder().fixed_delay(-1.0, DurationUnit::Seconds))
            .compute_delay();
        assert_eq!(delay.millis, -1_000.0);
        assert!(delay.is_immediate());
        assert_eq!(delay.as_duration(), Duration::ZERO);
    }
}
