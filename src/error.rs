//! Error types for the weightplan library.

use thiserror::Error;

/// Errors that can occur when parsing user-supplied values.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unknown sex: {0}")]
    UnknownSex(String),

    #[error("unknown goal: {0}")]
    UnknownGoal(String),

    #[error("invalid weekly rate: {0}")]
    InvalidRate(String),

    #[error("unknown metric: {0}")]
    UnknownMetric(String),

    #[error("age must be at least {min} years, got {value}")]
    AgeTooLow { value: u32, min: u32 },

    #[error("{field} must be positive: {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("body fat percentage must be between 0 and 100: {0}")]
    BodyFatOutOfRange(f64),
}

/// Errors returned by trend analysis when a series cannot be summarized.
#[derive(Debug, Error, PartialEq)]
pub enum TrendError {
    #[error("insufficient data: need at least {required} observations, got {available}")]
    InsufficientData { available: usize, required: usize },
}
