//! Stepwise conversion between delay units and milliseconds.

use crate::types::DurationUnit;

/// Multiplication steps taking one unit of `unit` down to milliseconds,
/// applied in order (hours -> minutes -> seconds -> milliseconds).
fn ladder(unit: DurationUnit) -> &'static [f64] {
    match unit {
        DurationUnit::Hours => &[60.0, 60.0, 1000.0],
        DurationUnit::Minutes => &[60.0, 1000.0],
        DurationUnit::Seconds => &[1000.0],
        DurationUnit::Milliseconds => &[],
    }
}

/// Convert `magnitude` expressed in `unit` to milliseconds.
///
/// No rounding is applied.
pub fn to_milliseconds(magnitude: f64, unit: DurationUnit) -> f64 {
    ladder(unit).iter().fold(magnitude, |acc, step| acc * step)
}

/// Convert `milliseconds` to a magnitude expressed in `unit`.
pub fn from_milliseconds(milliseconds: f64, unit: DurationUnit) -> f64 {
    ladder(unit).iter().fold(milliseconds, |acc, step| acc / step)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_milliseconds() {
        assert_eq!(to_milliseconds(250.0, DurationUnit::Milliseconds), 250.0);
        assert_eq!(to_milliseconds(0.6, DurationUnit::Seconds), 600.0);
        assert_eq!(to_milliseconds(2.0, DurationUnit::Minutes), 120_000.0);
        assert_eq!(to_milliseconds(1.0, DurationUnit::Hours), 3_600_000.0);
    }

    #[test]
    fn test_from_milliseconds() {
        assert_eq!(from_milliseconds(250.0, DurationUnit::Milliseconds), 250.0);
        assert_eq!(from_milliseconds(5_000.0, DurationUnit::Seconds), 5.0);
        assert_eq!(from_milliseconds(90_000.0, DurationUnit::Minutes), 1.5);
        assert_eq!(from_milliseconds(7_200_000.0, DurationUnit::Hours), 2.0);
    }

    #[test]
    fn test_round_trip_within_tolerance() {
        let samples = [0.0, 0.001, 0.6, 1.0, 2.0 / 3600.0, 0.8 / 60.0, 17.25, 1e6];
        for unit in DurationUnit::ALL {
            for x in samples {
                let back = to_milliseconds(from_milliseconds(x, unit), unit);
                assert!(
                    (back - x).abs() <= 1e-9 * x.abs().max(1.0),
                    "round trip of {x} via {unit} gave {back}"
                );
            }
        }
    }
}
