// src/engine/error.rs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BacktestError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    /// Bar/Signal series rejected before the first bar is processed.
    #[error("input validation failed: {reason}")]
    InputValidation { reason: String },

    /// Configuration value out of range, raised at construction time.
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name:   &'static str,
        value:  f64,
        reason: &'static str,
    },

    /// Configuration document could not be read into a `BacktestConfig`.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// Margin model called with non-finite or negative inputs.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
}

impl BacktestError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        BacktestError::InputValidation { reason: reason.into() }
    }
}
