use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnhanceError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Degenerate stretch range: down={down}, up={up}")]
    DegenerateRange { down: f32, up: f32 },

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EnhanceError {
    /// Stable machine-readable code, used in batch reports
    pub fn code(&self) -> &'static str {
        match self {
            EnhanceError::InvalidInput(_) => "INVALID_INPUT",
            EnhanceError::InvalidParameter(_) => "INVALID_PARAMETER",
            EnhanceError::DegenerateRange { .. } => "DEGENERATE_RANGE",
            EnhanceError::Encode(_) => "ENCODE_ERROR",
            EnhanceError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Serialized form of a per-file failure
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub error: String,
    pub code: String,
}

impl From<&EnhanceError> for ErrorReport {
    fn from(err: &EnhanceError) -> Self {
        Self {
            error: err.to_string(),
            code: err.code().to_string(),
        }
    }
}
