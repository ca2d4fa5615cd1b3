//! Error types for the Veil core.

use thiserror::Error;

/// Core errors that can occur while interpreting backend data.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid revealed content: {0}")]
    InvalidContent(String),

    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Validation errors for regions received from the backend.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("polygon has {0} points, at least 3 are required")]
    TooFewPoints(usize),

    #[error("polygon vertex {index} is not finite")]
    NonFiniteVertex { index: usize },

    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),

    #[error("region id is empty")]
    EmptyId,

    #[error("duplicate region id: {0}")]
    DuplicateId(String),
}
