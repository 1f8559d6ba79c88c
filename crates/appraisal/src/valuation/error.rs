use super::factors::AdjustmentFactorKind;

/// Failure raised by a single valuation calculation. Every variant is recoverable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValuationError {
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },
    #[error("{factor} adjustment {value} is outside the allowed range of ±{weight}")]
    OutOfRange {
        factor: AdjustmentFactorKind,
        value: f64,
        weight: f64,
    },
    #[error("insufficient data: {required} comparable(s) required, {actual} available")]
    InsufficientData { required: usize, actual: usize },
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl ValuationError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable label for API payloads.
    pub const fn kind(&self) -> &'static str {
        match self {
            ValuationError::InvalidInput { .. } => "invalid_input",
            ValuationError::OutOfRange { .. } => "out_of_range",
            ValuationError::InsufficientData { .. } => "insufficient_data",
            ValuationError::InvalidState(_) => "invalid_state",
        }
    }
}
