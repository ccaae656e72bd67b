use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{HintThresholds, EXACT_EPSILON};
use crate::types::{Attribute, HintVector};

/// Which way the guess missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Exact,
    /// Guessed value is above the secret's.
    TooHigh,
    /// Guessed value is below the secret's.
    TooLow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Closeness {
    Exact,
    Near,
    Warm,
    Far,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintLabel {
    pub direction: Direction,
    pub closeness: Closeness,
}

/// Presentation label for one deviation. The same thresholds apply to every attribute.
pub fn classify(deviation: f64, thresholds: &HintThresholds) -> HintLabel {
    let magnitude = deviation.abs();
    if magnitude <= EXACT_EPSILON {
        return HintLabel { direction: Direction::Exact, closeness: Closeness::Exact };
    }

    let direction = if deviation > 0.0 { Direction::TooHigh } else { Direction::TooLow };
    let closeness = if magnitude <= thresholds.near_max {
        Closeness::Near
    } else if magnitude <= thresholds.warm_max {
        Closeness::Warm
    } else {
        Closeness::Far
    };

    HintLabel { direction, closeness }
}

pub fn label_all(hints: &HintVector, thresholds: &HintThresholds) -> BTreeMap<Attribute, HintLabel> {
    hints
        .iter()
        .map(|(attribute, deviation)| (attribute, classify(deviation, thresholds)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t() -> HintThresholds {
        HintThresholds::default()
    }

    #[test]
    fn ten_percent_high_is_far() {
        let label = classify(0.10, &t());
        assert_eq!(label.direction, Direction::TooHigh);
        assert_eq!(label.closeness, Closeness::Far);
    }

    #[test]
    fn float_noise_is_exact() {
        let deviation = (100.000_000_000_1 - 100.0) / 100.0;
        assert_eq!(classify(deviation, &t()).closeness, Closeness::Exact);
        assert_eq!(classify(-deviation, &t()).direction, Direction::Exact);
        assert_eq!(classify(0.0, &t()).closeness, Closeness::Exact);
    }

    #[test]
    fn close_but_not_exact_is_near() {
        let label = classify(-1e-6, &t());
        assert_eq!(label.direction, Direction::TooLow);
        assert_eq!(label.closeness, Closeness::Near);
    }

    #[test]
    fn tier_boundaries_are_inclusive() {
        assert_eq!(classify(0.02, &t()).closeness, Closeness::Near);
        assert_eq!(classify(-0.05, &t()).closeness, Closeness::Warm);
        assert_eq!(classify(0.0501, &t()).closeness, Closeness::Far);
    }

    #[test]
    fn closeness_is_monotonic_in_magnitude() {
        let mut previous = Closeness::Exact;
        for step in 0..2_000 {
            let magnitude = step as f64 * 1e-4;
            let current = classify(magnitude, &t()).closeness;
            assert!(current >= previous, "{magnitude}: {current:?} < {previous:?}");
            previous = current;
        }
    }

    #[test]
    fn custom_thresholds_apply() {
        let wide = HintThresholds::new(0.10, 0.25).unwrap();
        assert_eq!(classify(0.10, &wide).closeness, Closeness::Near);
        assert_eq!(classify(0.20, &wide).closeness, Closeness::Warm);
    }

    #[test]
    fn label_all_covers_present_entries_only() {
        let mut hints = HintVector::default();
        hints.insert(Attribute::Price, 0.10);
        hints.insert(Attribute::DayLow, 0.0);
        let labels = label_all(&hints, &t());
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[&Attribute::DayLow].closeness, Closeness::Exact);
        assert!(!labels.contains_key(&Attribute::MarketCap));
    }
}
