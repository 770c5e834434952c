use thiserror::Error;

/// Errors produced by the prediction-and-decision core.
///
/// Every public engine operation returns one of these rather than panicking
/// across the interface boundary.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },
    #[error("model artifact not available: {artifact}")]
    ModelUnavailable { artifact: &'static str },
    #[error("labeling failed at row {row}: {reason}")]
    Labeling { row: usize, reason: String },
}

impl CoreError {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
