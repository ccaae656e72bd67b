use tracing::debug;

use crate::error::{GameError, GameResult};
use crate::types::{Attribute, AttributeSnapshot, HintVector};

/// Signed relative deviation of `guessed` from `secret` for every attribute
/// known on both sides. Pure and deterministic.
///
/// A secret value of zero, a negative value, or a non-finite value cannot serve
/// as a denominator and fails with `InvalidAttribute`. A guessed value that is
/// negative or non-finite is treated as unknown.
pub fn compare(secret: &AttributeSnapshot, guessed: &AttributeSnapshot) -> GameResult<HintVector> {
    let mut hints = HintVector::default();

    for attribute in Attribute::ALL {
        let (Some(secret_value), Some(guess_value)) = (secret.get(attribute), guessed.get(attribute)) else {
            continue;
        };

        check_secret_value(attribute, secret_value)?;

        if !guess_value.is_finite() || guess_value < 0.0 {
            debug!(%attribute, guess_value, "Ignoring unusable guessed attribute");
            continue;
        }

        hints.insert(attribute, (guess_value - secret_value) / secret_value);
    }

    Ok(hints)
}

fn check_secret_value(attribute: Attribute, value: f64) -> GameResult<()> {
    let reason = if !value.is_finite() {
        "secret value is not finite"
    } else if value < 0.0 {
        "secret value is negative"
    } else if value == 0.0 {
        "secret value is zero"
    } else {
        return Ok(());
    };
    Err(GameError::InvalidAttribute { attribute, reason: reason.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(price: f64, high: f64, low: f64, vol: f64, cap: f64) -> AttributeSnapshot {
        AttributeSnapshot {
            price: Some(price),
            day_high: Some(high),
            day_low: Some(low),
            avg_volume: Some(vol),
            market_cap: Some(cap),
        }
    }

    #[test]
    fn relative_deviation_per_attribute() {
        let secret = snap(100.0, 105.0, 95.0, 1_000_000.0, 2.0e12);
        let guess = snap(110.0, 105.0, 76.0, 1_500_000.0, 1.0e12);
        let hints = compare(&secret, &guess).unwrap();

        assert!((hints.get(Attribute::Price).unwrap() - 0.10).abs() < 1e-12);
        assert_eq!(hints.get(Attribute::DayHigh), Some(0.0));
        assert!((hints.get(Attribute::DayLow).unwrap() + 0.20).abs() < 1e-12);
        assert!((hints.get(Attribute::AvgVolume).unwrap() - 0.5).abs() < 1e-12);
        assert!((hints.get(Attribute::MarketCap).unwrap() + 0.5).abs() < 1e-12);
    }

    #[test]
    fn unknown_on_either_side_is_absent_not_zero() {
        let mut secret = snap(100.0, 105.0, 95.0, 1_000.0, 5_000.0);
        secret.avg_volume = None;
        let mut guess = snap(100.0, 105.0, 95.0, 1_000.0, 5_000.0);
        guess.market_cap = None;

        let hints = compare(&secret, &guess).unwrap();
        assert_eq!(hints.len(), 3);
        assert_eq!(hints.get(Attribute::AvgVolume), None);
        assert_eq!(hints.get(Attribute::MarketCap), None);
        assert_eq!(hints.get(Attribute::Price), Some(0.0));
    }

    #[test]
    fn zero_secret_is_invalid_attribute() {
        let secret = snap(0.0, 1.0, 1.0, 1.0, 1.0);
        let guess = snap(10.0, 1.0, 1.0, 1.0, 1.0);
        let err = compare(&secret, &guess).unwrap_err();
        assert!(matches!(err, GameError::InvalidAttribute { attribute: Attribute::Price, .. }));
    }

    #[test]
    fn zero_secret_with_unknown_guess_is_fine() {
        let secret = snap(0.0, 1.0, 1.0, 1.0, 1.0);
        let guess = AttributeSnapshot { day_high: Some(2.0), ..Default::default() };
        let hints = compare(&secret, &guess).unwrap();
        assert_eq!(hints.get(Attribute::DayHigh), Some(1.0));
        assert_eq!(hints.len(), 1);
    }

    #[test]
    fn non_finite_secret_is_invalid_attribute() {
        let secret = snap(100.0, f64::NAN, 1.0, 1.0, 1.0);
        let guess = snap(100.0, 1.0, 1.0, 1.0, 1.0);
        assert!(matches!(
            compare(&secret, &guess),
            Err(GameError::InvalidAttribute { attribute: Attribute::DayHigh, .. })
        ));
    }

    #[test]
    fn unusable_guess_value_is_unknown() {
        let secret = snap(100.0, 1.0, 1.0, 1.0, 1.0);
        let guess = snap(f64::INFINITY, 1.0, -3.0, 1.0, 1.0);
        let hints = compare(&secret, &guess).unwrap();
        assert_eq!(hints.get(Attribute::Price), None);
        assert_eq!(hints.get(Attribute::DayLow), None);
        assert_eq!(hints.len(), 3);
    }

    #[test]
    fn swapping_sides_negates_sign() {
        let pairs = [
            (snap(100.0, 120.0, 80.0, 5e6, 3e11), snap(90.0, 130.0, 80.0, 7e6, 1e11)),
            (snap(1.5, 1.7, 1.2, 10.0, 2e8), snap(250.0, 251.0, 0.9, 9.0, 2e8)),
        ];
        for (a, b) in pairs {
            let forward = compare(&a, &b).unwrap();
            let backward = compare(&b, &a).unwrap();
            for attribute in Attribute::ALL {
                let f = forward.get(attribute).unwrap();
                let r = backward.get(attribute).unwrap();
                if f == 0.0 {
                    assert_eq!(r, 0.0, "{attribute}");
                } else {
                    assert_eq!(f > 0.0, r < 0.0, "{attribute}: {f} vs {r}");
                }
            }
        }
    }

    #[test]
    fn deterministic() {
        let a = snap(12.0, 13.0, 11.0, 100.0, 1000.0);
        let b = snap(14.0, 12.0, 11.5, 80.0, 900.0);
        assert_eq!(compare(&a, &b).unwrap(), compare(&a, &b).unwrap());
    }
}
