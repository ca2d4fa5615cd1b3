//! Error types for the store module.

use thiserror::Error;

use crate::session::SessionEpoch;

/// Errors that can occur during store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No session has been loaded yet.
    #[error("no image session loaded")]
    NoSession,

    /// The operation targeted a session that has since been replaced.
    #[error("stale session: operation for epoch {requested}, current epoch {current}")]
    StaleSession {
        requested: SessionEpoch,
        current: SessionEpoch,
    },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
