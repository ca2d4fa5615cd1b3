//! Mutable viewer state, owned behind a single lock.

use std::collections::HashMap;
use std::sync::Arc;

use image::RgbaImage;
use tokio::sync::watch;
use tracing::info;
use veil_core::{ImageSession, RegionId, Role};
use veil_store::{RegionStore, RevealCache, SessionEpoch};

use crate::controller::{Notice, RevealOutcome, RevealState};

/// Receiver for the outcome of an in-flight reveal.
pub(crate) type PendingReveal = watch::Receiver<Option<RevealOutcome>>;

/// Everything that changes while the viewer runs.
///
/// Invariants:
/// - every id in `cache` and `pending` belongs to the session in `store`
/// - an id is never in `cache` and `pending` at once
/// - `base_image`, when set, was decoded for the session at its epoch
#[derive(Default)]
pub(crate) struct ViewState {
    pub(crate) store: RegionStore,
    pub(crate) cache: RevealCache,
    pub(crate) pending: HashMap<RegionId, PendingReveal>,
    pub(crate) notices: Vec<Notice>,
    pub(crate) role: Role,
    pub(crate) base_image: Option<(SessionEpoch, Arc<RgbaImage>)>,
}

impl ViewState {
    /// Replace the session and drop everything that belonged to the old one.
    ///
    /// In-flight reveals for the old session keep running; their results are
    /// discarded on arrival because the epoch no longer matches.
    pub(crate) fn install(&mut self, session: ImageSession) -> SessionEpoch {
        let image_id = session.image_id.clone();
        let regions = session.regions.len();

        let epoch = self.store.load(session);
        self.cache.clear();
        self.pending.clear();
        self.base_image = None;

        info!(%epoch, %image_id, regions, "image session installed");
        epoch
    }

    pub(crate) fn phase(&self, id: &RegionId) -> RevealState {
        if self.cache.has(id) {
            RevealState::Revealed
        } else if self.pending.contains_key(id) {
            RevealState::Pending
        } else {
            RevealState::Redacted
        }
    }

    /// The decoded base image, if it belongs to the current session.
    pub(crate) fn base_image(&self) -> Option<Arc<RgbaImage>> {
        match &self.base_image {
            Some((epoch, image)) if self.store.is_current(*epoch) => Some(Arc::clone(image)),
            _ => None,
        }
    }
}
