//! Region store: the single current image session.
//!
//! A session is only ever replaced as a whole. Every load bumps the epoch, so
//! work started against an earlier load can tell it has been superseded even
//! when the same image is loaded twice.

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use veil_core::{ImageDimensions, ImageSession};

use crate::error::{Result, StoreError};

/// Monotonic counter identifying one load of the region store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SessionEpoch(u64);

impl SessionEpoch {
    /// Epoch before anything has been loaded.
    pub const NONE: Self = Self(0);

    pub const fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SessionEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Holds the current image session.
///
/// Readers get an `Arc` snapshot, so they observe either the old session or
/// the new one in full, never a mix.
#[derive(Debug, Default)]
pub struct RegionStore {
    current: Option<Arc<ImageSession>>,
    epoch: SessionEpoch,
}

impl RegionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current session and return its epoch.
    pub fn load(&mut self, session: ImageSession) -> SessionEpoch {
        self.epoch = self.epoch.next();
        debug!(
            epoch = %self.epoch,
            image_id = %session.image_id,
            regions = session.regions.len(),
            "session loaded"
        );
        self.current = Some(Arc::new(session));
        self.epoch
    }

    /// The active session, if any.
    pub fn current(&self) -> Option<Arc<ImageSession>> {
        self.current.clone()
    }

    /// Epoch of the active session ([`SessionEpoch::NONE`] before the first load).
    pub fn epoch(&self) -> SessionEpoch {
        self.epoch
    }

    /// Whether `epoch` still identifies the active session.
    pub fn is_current(&self, epoch: SessionEpoch) -> bool {
        self.current.is_some() && self.epoch == epoch
    }

    /// The active session, only if it is still the one loaded at `epoch`.
    pub fn current_at(&self, epoch: SessionEpoch) -> Result<Arc<ImageSession>> {
        let session = self.current.clone().ok_or(StoreError::NoSession)?;
        if self.epoch != epoch {
            return Err(StoreError::StaleSession {
                requested: epoch,
                current: self.epoch,
            });
        }
        Ok(session)
    }

    /// Record the base image's intrinsic dimensions for the session loaded at
    /// `epoch`.
    ///
    /// The session snapshot is swapped for a new one carrying the dimensions;
    /// the epoch does not change since regions and identity are the same.
    pub fn set_dimensions(&mut self, epoch: SessionEpoch, dimensions: ImageDimensions) -> Result<()> {
        let session = self.current_at(epoch)?;
        if session.dimensions == Some(dimensions) {
            return Ok(());
        }
        let updated = ImageSession::clone(&session).with_dimensions(dimensions);
        self.current = Some(Arc::new(updated));
        Ok(())
    }
}
