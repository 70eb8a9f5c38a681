//! Volatility-implied range and outcome classification
//!
//! The volatility index quotes an annualized percentage move. Scaling it by
//! `sqrt(periods_per_year)` gives the expected one-period move, which is
//! applied symmetrically around the index open.

use serde::Serialize;

use crate::types::Outcome;

/// Symmetric expected-range band around an opening price
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Band {
    pub lower: f64,
    pub upper: f64,
}

impl Band {
    /// Inclusive at both ends
    pub fn contains(&self, price: f64) -> bool {
        price >= self.lower && price <= self.upper
    }
}

/// Expected one-period move in percent
pub fn period_pct(vol_open: f64, periods_per_year: f64) -> f64 {
    vol_open / periods_per_year.sqrt()
}

/// Band for one anchor.
///
/// Negative volatility quotes are not rejected here; they come from bad
/// upstream data and simply produce an inverted range.
pub fn evaluate_band(vol_open: f64, index_open: f64, periods_per_year: f64) -> Band {
    let range_points = index_open * (period_pct(vol_open, periods_per_year) / 100.0);
    Band {
        lower: index_open - range_points,
        upper: index_open + range_points,
    }
}

pub fn classify(target_close: f64, band: &Band) -> Outcome {
    if band.contains(target_close) {
        Outcome::Pass
    } else {
        Outcome::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cycle;

    #[test]
    fn test_daily_band_scenario() {
        let band = evaluate_band(15.8, 100.0, Cycle::Daily.periods_per_year());
        assert!((period_pct(15.8, 252.0) - 0.9953).abs() < 1e-3);
        assert!((band.lower - 99.0045).abs() < 1e-3);
        assert!((band.upper - 100.9955).abs() < 1e-3);

        assert_eq!(classify(100.5, &band), Outcome::Pass);
        assert_eq!(classify(101.2, &band), Outcome::Fail);
    }

    #[test]
    fn test_weekly_band_scenario() {
        let band = evaluate_band(14.4, 20000.0, Cycle::Weekly.periods_per_year());
        assert!((period_pct(14.4, 52.0) - 1.997).abs() < 1e-3);
        assert!((band.lower - 19600.6).abs() < 0.1);
        assert!((band.upper - 20399.4).abs() < 0.1);
    }

    #[test]
    fn test_zero_vol_is_zero_width() {
        let band = evaluate_band(0.0, 18250.5, 252.0);
        assert_eq!(band.lower, 18250.5);
        assert_eq!(band.upper, 18250.5);
        assert_eq!(classify(18250.5, &band), Outcome::Pass);
        assert_eq!(classify(18250.51, &band), Outcome::Fail);
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let band = Band {
            lower: 99.0,
            upper: 101.0,
        };
        assert_eq!(classify(99.0, &band), Outcome::Pass);
        assert_eq!(classify(101.0, &band), Outcome::Pass);
        assert_eq!(classify(98.999, &band), Outcome::Fail);
    }

    #[test]
    fn test_lower_never_above_upper_for_non_negative_vol() {
        for vol in [0.0, 0.5, 12.0, 35.7, 80.0] {
            for open in [1.0, 250.0, 22000.0] {
                let band = evaluate_band(vol, open, 52.0);
                assert!(band.lower <= band.upper);
            }
        }
    }

    #[test]
    fn test_negative_vol_passes_through() {
        let band = evaluate_band(-15.8, 100.0, 252.0);
        assert!(band.lower > band.upper);
        assert_eq!(classify(100.0, &band), Outcome::Fail);
    }
}
