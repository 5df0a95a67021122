//! Error handling for the fund tracker core
//!
//! Defines typed domain errors and establishes a unified Result type
//! using anyhow for context chaining and error propagation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Typed errors for tracker operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("event amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("no snapshot observed on {0}")]
    UnknownSnapshotDate(NaiveDate),

    #[error("snapshot interval out of order: {previous} is not before {current}")]
    IntervalOrder {
        previous: NaiveDate,
        current: NaiveDate,
    },
}

/// Result type alias for tracker operations
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_formatting_is_readable() {
        let err = TrackerError::NonPositiveAmount(dec!(-5));
        assert_eq!(err.to_string(), "event amount must be positive, got -5");
    }

    #[test]
    fn test_interval_order_names_both_dates() {
        let err = TrackerError::IntervalOrder {
            previous: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            current: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("2025-07-01"));
        assert!(msg.contains("2025-06-01"));
    }

    #[test]
    fn test_anyhow_context_chains_errors() {
        use anyhow::Context;
        let result: Result<()> = Err(TrackerError::UnknownSnapshotDate(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        ))
        .map_err(anyhow::Error::from)
        .context("failed to explain interval");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to explain interval"));
        assert!(format!("{:?}", err).contains("no snapshot observed"));
    }
}
