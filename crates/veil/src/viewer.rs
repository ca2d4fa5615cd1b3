//! The Viewer: unified API over sessions, reveals and the surface.

use std::path::Path;
use std::sync::Arc;

use image::{ImageFormat, RgbaImage};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use veil_client::{redacted_path, Backend, HttpBackend, Upload};
use veil_core::{
    sanitize_regions, CoreError, ImageDimensions, ImageId, ImageSession, Region, RegionId, Role,
    RevealedContent, SanitizedRegions,
};
use veil_store::SessionEpoch;

use crate::config::ViewerConfig;
use crate::controller::{Notice, RevealController, RevealOutcome, RevealState};
use crate::error::{Result, ViewerError};
use crate::state::ViewState;
use crate::surface::{self, Scene};

/// The main Viewer struct.
///
/// Provides a unified API for:
/// - Uploading an image, or reopening a stored one
/// - Toggling the Reviewer role
/// - Revealing regions by id or by overlay index
/// - Rendering the overlay scene and compositing it
///
/// Cloning a viewer yields another handle to the same state.
pub struct Viewer<B> {
    backend: Arc<B>,
    state: Arc<Mutex<ViewState>>,
    controller: RevealController<B>,
    config: ViewerConfig,
}

impl<B> Clone for Viewer<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            state: Arc::clone(&self.state),
            controller: self.controller.clone(),
            config: self.config.clone(),
        }
    }
}

impl Viewer<HttpBackend> {
    /// Create a viewer talking HTTP to `config.api_base`.
    pub fn connect(config: ViewerConfig) -> Result<Self> {
        let backend = HttpBackend::new(config.client_config())?;
        Ok(Self::new(backend, config))
    }

    /// Create an HTTP viewer configured from the environment.
    pub fn from_env() -> Result<Self> {
        Self::connect(ViewerConfig::from_env()?)
    }
}

impl<B: Backend + 'static> Viewer<B> {
    /// Create a new viewer over `backend`.
    pub fn new(backend: B, config: ViewerConfig) -> Self {
        Self::with_backend(Arc::new(backend), config)
    }

    /// Create a viewer over a backend that is shared with the caller.
    pub fn with_backend(backend: Arc<B>, config: ViewerConfig) -> Self {
        let state = Arc::new(Mutex::new(ViewState::default()));
        let controller = RevealController::new(Arc::clone(&backend), Arc::clone(&state));
        Self {
            backend,
            state,
            controller,
            config,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn controller(&self) -> &RevealController<B> {
        &self.controller
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Role
    // ─────────────────────────────────────────────────────────────────────────

    /// Set the "Reviewer" toggle. Affects requests sent from now on.
    pub async fn set_reviewer(&self, reviewer: bool) {
        let role = Role::from_reviewer_flag(reviewer);
        self.state.lock().await.role = role;
        debug!(?role, "role changed");
    }

    pub async fn role(&self) -> Role {
        self.state.lock().await.role
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────────

    /// Upload an image and make the result the current session.
    ///
    /// On failure the current session is left untouched and an upload notice
    /// is recorded.
    pub async fn upload(&self, upload: Upload) -> Result<SessionEpoch> {
        info!(file = %upload.file_name, bytes = upload.bytes.len(), "uploading image");

        let response = match self.backend.ingest(upload).await {
            Ok(response) => response,
            Err(e) => return Err(self.fail(e.into(), upload_notice).await),
        };
        let redacted_url = match self.backend.resolve(&response.redacted_url) {
            Ok(url) => url,
            Err(e) => return Err(self.fail(e.into(), upload_notice).await),
        };

        let regions = accept_regions(&response.image_id, response.regions);
        let session = ImageSession::new(response.image_id, redacted_url, regions);
        Ok(self.install(session).await)
    }

    /// Read an image file and upload it.
    pub async fn upload_path(&self, path: impl AsRef<Path>) -> Result<SessionEpoch> {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(e.into(), upload_notice).await),
        };

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mut upload = Upload::new(file_name, bytes);
        if let Ok(format) = ImageFormat::from_path(path) {
            upload = upload.with_media_type(format.to_mime_type());
        }
        self.upload(upload).await
    }

    /// Reopen a previously ingested image from its stored manifest.
    pub async fn open(&self, image_id: &ImageId) -> Result<SessionEpoch> {
        let manifest = match self.backend.manifest(image_id).await {
            Ok(manifest) => manifest,
            Err(e) => return Err(self.fail(e.into(), open_notice).await),
        };
        let redacted_url = match self.backend.resolve(&redacted_path(image_id)) {
            Ok(url) => url,
            Err(e) => return Err(self.fail(e.into(), open_notice).await),
        };

        let regions = accept_regions(image_id, manifest.regions());
        let session = ImageSession::new(image_id.clone(), redacted_url, regions);
        Ok(self.install(session).await)
    }

    /// Fetch and decode the redacted base image of the session loaded at
    /// `epoch`, recording its intrinsic dimensions.
    ///
    /// Fails with a stale-session error if another session was loaded
    /// meanwhile; the decoded image is then discarded.
    pub async fn load_base_image(&self, epoch: SessionEpoch) -> Result<ImageDimensions> {
        let url = self.state.lock().await.store.current_at(epoch)?.redacted_url.clone();

        let bytes = self.backend.fetch_image(&url).await?;
        let decoded = image::load_from_memory(&bytes)?.to_rgba8();
        let (width, height) = decoded.dimensions();
        let dims = ImageDimensions::new(width, height)
            .ok_or(CoreError::InvalidDimensions { width, height })?;

        let mut state = self.state.lock().await;
        state.store.set_dimensions(epoch, dims)?;
        state.base_image = Some((epoch, Arc::new(decoded)));
        debug!(%epoch, width, height, "base image loaded");
        Ok(dims)
    }

    /// The current session, if any.
    pub async fn session(&self) -> Option<Arc<ImageSession>> {
        self.state.lock().await.store.current()
    }

    /// Epoch of the current session.
    pub async fn epoch(&self) -> SessionEpoch {
        self.state.lock().await.store.epoch()
    }

    async fn install(&self, session: ImageSession) -> SessionEpoch {
        let epoch = self.state.lock().await.install(session);
        if self.config.load_base_image {
            if let Err(e) = self.load_base_image(epoch).await {
                warn!(%epoch, error = %e, "base image unavailable, overlays hidden");
            }
        }
        epoch
    }

    async fn fail(&self, error: ViewerError, notice: fn(String) -> Notice) -> ViewerError {
        let notice = notice(error.to_string());
        warn!(error = %error, "{}", notice.message());
        self.state.lock().await.notices.push(notice);
        error
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reveal
    // ─────────────────────────────────────────────────────────────────────────

    /// Reveal one region of the current session.
    pub async fn reveal(&self, id: &RegionId) -> RevealOutcome {
        self.controller.reveal(id).await
    }

    /// Reveal several regions concurrently. Outcomes are in input order.
    pub async fn reveal_many(&self, ids: &[RegionId]) -> Vec<RevealOutcome> {
        self.controller.reveal_many(ids).await
    }

    /// Handle a click on the overlay at `index`.
    pub async fn click(&self, index: usize) -> RevealOutcome {
        let id = {
            let state = self.state.lock().await;
            let Some(session) = state.store.current() else {
                return RevealOutcome::UnknownRegion;
            };
            match session.regions.get(index) {
                None => return RevealOutcome::UnknownRegion,
                Some(Region { id: None, .. }) => {
                    debug!(index, "click on view-only region");
                    return RevealOutcome::ViewOnly;
                }
                Some(Region { id: Some(id), .. }) => id.clone(),
            }
        };
        self.reveal(&id).await
    }

    /// Reveal state of `id`, or `None` if it is not in the current session.
    pub async fn state(&self, id: &RegionId) -> Option<RevealState> {
        let state = self.state.lock().await;
        let session = state.store.current()?;
        session.contains(id).then(|| state.phase(id))
    }

    /// Cached content of `id`, if it has been revealed.
    pub async fn revealed(&self, id: &RegionId) -> Option<RevealedContent> {
        self.state.lock().await.cache.get(id).cloned()
    }

    /// Number of regions revealed in the current session.
    pub async fn revealed_count(&self) -> usize {
        self.state.lock().await.cache.len()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Surface
    // ─────────────────────────────────────────────────────────────────────────

    /// Describe the current surface, or `None` before the first upload.
    pub async fn render(&self) -> Option<Scene> {
        let state = self.state.lock().await;
        let session = state.store.current()?;
        Some(surface::render(&session, &state.cache, |id| state.phase(id)))
    }

    /// Rasterise the current surface over the decoded base image.
    pub async fn compose(&self) -> Result<RgbaImage> {
        let (base, scene) = {
            let state = self.state.lock().await;
            let session = state.store.current().ok_or(ViewerError::NoSession)?;
            let base = state.base_image().ok_or(ViewerError::BaseImageMissing)?;
            let scene = surface::render(&session, &state.cache, |id| state.phase(id));
            (base, scene)
        };
        Ok(surface::compose(&base, &scene))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notices
    // ─────────────────────────────────────────────────────────────────────────

    /// Notices recorded so far, oldest first.
    pub async fn notices(&self) -> Vec<Notice> {
        self.state.lock().await.notices.clone()
    }

    /// Take and clear the recorded notices.
    pub async fn drain_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.state.lock().await.notices)
    }
}

fn upload_notice(reason: String) -> Notice {
    Notice::UploadFailed { reason }
}

fn open_notice(reason: String) -> Notice {
    Notice::OpenFailed { reason }
}

/// Keep well-formed regions, logging the ones that are dropped.
fn accept_regions(image_id: &ImageId, regions: Vec<Region>) -> Vec<Region> {
    let SanitizedRegions { accepted, rejected } = sanitize_regions(regions);
    for (index, error) in &rejected {
        warn!(%image_id, index, %error, "dropping malformed region");
    }
    accepted
}
