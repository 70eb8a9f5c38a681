//! Error types for vixband
//!
//! Lookup misses and missing expiry dates are recoverable and surface as a
//! [`SkipReason`]; only configuration and payload faults stop a run.

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::Weekday;

/// A candle series has no entry for the requested calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no {instrument} candle for {date}")]
pub struct CandleNotFound {
    pub instrument: String,
    pub date: NaiveDate,
}

/// Why an anchor produced no classification record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error(transparent)]
    CandleNotFound(#[from] CandleNotFound),

    /// The series ended before the next expiry weekday after the anchor.
    #[error("no {expiry} after {anchor} before the series ends")]
    NoTargetAvailable { anchor: NaiveDate, expiry: Weekday },
}

/// Errors that stop a run before any record is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BacktestError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The provider payload could not be turned into a candle series.
    #[error("malformed candle payload: {0}")]
    Payload(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_not_found_message() {
        let err = CandleNotFound {
            instrument: "NSE_INDEX|India VIX".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
        };
        assert_eq!(err.to_string(), "no NSE_INDEX|India VIX candle for 2024-03-08");

        let skip: SkipReason = err.clone().into();
        assert_eq!(skip.to_string(), err.to_string());
    }

    #[test]
    fn test_no_target_message() {
        let skip = SkipReason::NoTargetAvailable {
            anchor: NaiveDate::from_ymd_opt(2024, 3, 25).unwrap(),
            expiry: Weekday::Friday,
        };
        assert_eq!(
            skip.to_string(),
            "no Friday after 2024-03-25 before the series ends"
        );
    }

    #[test]
    fn test_invalid_configuration_message() {
        let err = BacktestError::InvalidConfiguration("run.start_day is required".into());
        assert_eq!(
            err.to_string(),
            "invalid configuration: run.start_day is required"
        );
    }
}
