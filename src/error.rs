use thiserror::Error;

/// Result type for forecasting operations
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors raised while building or evaluating a forecasting model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Invalid configuration value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Tensor dimensions disagree with the configured architecture
    #[error("Shape mismatch for '{input}': expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        input: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A covariate block the model was configured with is absent from the batch
    #[error("Missing input '{input}': model expects {channels} channels")]
    MissingInput { input: &'static str, channels: usize },
}

impl ForecastError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ForecastError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn shape<const D: usize>(
        input: &'static str,
        expected: [usize; D],
        actual: [usize; D],
    ) -> Self {
        ForecastError::ShapeMismatch {
            input,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

/// Fails with [`ForecastError::InvalidParameter`] when `value` is zero.
pub(crate) fn ensure_positive(name: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(ForecastError::invalid(name, "must be greater than zero"));
    }
    Ok(())
}
