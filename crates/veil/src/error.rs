//! Error types for the viewer.

use thiserror::Error;
use veil_client::ClientError;
use veil_core::{CoreError, RegionId};
use veil_store::StoreError;

/// Errors that can occur during viewer operations.
///
/// Reveal failures are not errors: they are reported as
/// [`RevealOutcome`](crate::RevealOutcome) values plus a notice.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// Content or dimension error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Session store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Backend error.
    #[error("backend error: {0}")]
    Client(#[from] ClientError),

    /// The redacted base image or a revealed patch could not be decoded.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Local file error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// No image session is loaded.
    #[error("no image loaded")]
    NoSession,

    /// The redacted base image of the current session has not been loaded.
    #[error("base image not loaded")]
    BaseImageMissing,

    /// The region does not belong to the current session.
    #[error("unknown region: {0}")]
    UnknownRegion(RegionId),
}

/// Result type for viewer operations.
pub type Result<T> = std::result::Result<T, ViewerError>;
