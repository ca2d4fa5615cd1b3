//! Backend abstraction for the redaction service.
//!
//! The backend detects and redacts regions on upload and decrypts individual
//! regions on request. Implementations may use HTTP or anything else; the
//! viewer only sees this trait.

use async_trait::async_trait;
use bytes::Bytes;

use veil_core::{ImageId, Role};

use crate::error::Result;
use crate::messages::{IngestResponse, Manifest, RevealRequest, RevealResponse, Upload};

/// Boundary trait for the redaction backend.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Backend: Send + Sync {
    /// Upload an image for detection and redaction.
    async fn ingest(&self, upload: Upload) -> Result<IngestResponse>;

    /// Fetch the bytes of an image by its resolved reference.
    async fn fetch_image(&self, url: &str) -> Result<Bytes>;

    /// Ask for the decrypted content of the given regions.
    ///
    /// `role` is conveyed to the backend as an authorization hint. A refusal
    /// must surface as [`ClientError::Forbidden`](crate::ClientError::Forbidden),
    /// distinct from every other failure.
    async fn reveal(
        &self,
        image_id: &ImageId,
        request: &RevealRequest,
        role: Role,
    ) -> Result<RevealResponse>;

    /// Fetch the stored manifest of a previously ingested image.
    async fn manifest(&self, image_id: &ImageId) -> Result<Manifest>;

    /// Turn a reference returned by the backend into an absolute one.
    ///
    /// The default leaves it unchanged.
    fn resolve(&self, reference: &str) -> Result<String> {
        Ok(reference.to_string())
    }
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for std::sync::Arc<B> {
    async fn ingest(&self, upload: Upload) -> Result<IngestResponse> {
        (**self).ingest(upload).await
    }

    async fn fetch_image(&self, url: &str) -> Result<Bytes> {
        (**self).fetch_image(url).await
    }

    async fn reveal(
        &self,
        image_id: &ImageId,
        request: &RevealRequest,
        role: Role,
    ) -> Result<RevealResponse> {
        (**self).reveal(image_id, request, role).await
    }

    async fn manifest(&self, image_id: &ImageId) -> Result<Manifest> {
        (**self).manifest(image_id).await
    }

    fn resolve(&self, reference: &str) -> Result<String> {
        (**self).resolve(reference)
    }
}

/// A scripted in-memory backend for testing.
///
/// Images are staged ahead of time and handed out one per ingest call.
/// Reveal calls are recorded, can be held at a gate to keep them in flight,
/// and can be made to fail with injected faults.
pub mod memory {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use tokio::sync::{Mutex, Notify, Semaphore};
    use url::Url;
    use veil_core::{Region, RegionId};

    use crate::error::ClientError;
    use crate::http::DEFAULT_API_BASE;
    use crate::messages::{redacted_path, ManifestRegion, RevealedEntry};

    /// An image the backend will return from the next ingest.
    #[derive(Debug, Clone)]
    pub struct StagedImage {
        pub image_id: ImageId,
        pub regions: Vec<Region>,
        /// Encoded redacted image served at the redacted URL.
        pub redacted: Bytes,
        /// Data URL returned for each revealable region.
        pub patches: HashMap<RegionId, String>,
    }

    impl StagedImage {
        pub fn new(image_id: impl Into<String>, redacted: impl Into<Bytes>) -> Self {
            Self {
                image_id: ImageId::new(image_id),
                regions: Vec::new(),
                redacted: redacted.into(),
                patches: HashMap::new(),
            }
        }

        /// Add a region; if it has an id, `patch` is what revealing it returns.
        pub fn with_region(mut self, region: Region, patch: impl Into<String>) -> Self {
            if let Some(id) = &region.id {
                self.patches.insert(id.clone(), patch.into());
            }
            self.regions.push(region);
            self
        }
    }

    /// A failure to inject into the next reveal call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RevealFault {
        /// Respond with this non-success status.
        Status(u16),
        /// Fail before any response.
        Transport,
        /// Succeed but leave the requested regions out of the body.
        OmitContent,
        /// Succeed with content that is not valid base64.
        Garbage,
        /// Panic inside the reveal call.
        Panic,
    }

    /// One recorded reveal call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RevealCall {
        pub image_id: ImageId,
        pub region_ids: Vec<RegionId>,
        pub role: Role,
    }

    #[derive(Default)]
    struct MemoryState {
        staged: VecDeque<StagedImage>,
        images: HashMap<ImageId, StagedImage>,
        faults: VecDeque<RevealFault>,
        ingest_fault: Option<ClientError>,
        calls: Vec<RevealCall>,
    }

    /// In-memory backend implementation.
    pub struct MemoryBackend {
        base: Url,
        state: Mutex<MemoryState>,
        require_reviewer: AtomicBool,
        held: AtomicBool,
        gate: Semaphore,
        call_seen: Notify,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MemoryBackend {
        /// Create a backend that requires the Reviewer role for reveals.
        pub fn new() -> Self {
            Self {
                base: Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL"),
                state: Mutex::new(MemoryState::default()),
                require_reviewer: AtomicBool::new(true),
                held: AtomicBool::new(false),
                gate: Semaphore::new(0),
                call_seen: Notify::new(),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        /// Resolve relative references against `base` instead of the default.
        pub fn with_base(mut self, base: Url) -> Self {
            self.base = base;
            self
        }

        /// Queue an image for the next ingest call.
        pub async fn stage(&self, image: StagedImage) {
            self.state.lock().await.staged.push_back(image);
        }

        /// Register an image as already ingested, e.g. for manifest reopen.
        pub async fn insert(&self, image: StagedImage) {
            self.state.lock().await.images.insert(image.image_id.clone(), image);
        }

        /// Make the next ingest call fail with `error`.
        pub async fn fail_next_ingest(&self, error: ClientError) {
            self.state.lock().await.ingest_fault = Some(error);
        }

        /// Make the next reveal call fail with `fault`.
        pub async fn inject(&self, fault: RevealFault) {
            self.state.lock().await.faults.push_back(fault);
        }

        /// Whether reveals require the Reviewer role.
        pub fn set_require_reviewer(&self, required: bool) {
            self.require_reviewer.store(required, Ordering::SeqCst);
        }

        /// Keep subsequent reveal calls in flight until released.
        pub fn hold_reveals(&self) {
            self.held.store(true, Ordering::SeqCst);
        }

        /// Let `n` held reveal calls proceed, in arrival order.
        pub fn release_reveals(&self, n: usize) {
            self.gate.add_permits(n);
        }

        /// Number of reveal calls received so far.
        pub async fn reveal_calls(&self) -> usize {
            self.state.lock().await.calls.len()
        }

        /// Every reveal call received so far.
        pub async fn calls(&self) -> Vec<RevealCall> {
            self.state.lock().await.calls.clone()
        }

        /// Wait until at least `n` reveal calls have arrived.
        pub async fn wait_for_calls(&self, n: usize) {
            loop {
                let notified = self.call_seen.notified();
                if self.reveal_calls().await >= n {
                    return;
                }
                notified.await;
            }
        }

        /// Highest number of reveal calls that were in flight at once.
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        async fn record(&self, call: RevealCall) {
            self.state.lock().await.calls.push(call);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.call_seen.notify_waiters();
        }

        async fn respond(
            &self,
            image_id: &ImageId,
            request: &RevealRequest,
            role: Role,
        ) -> Result<RevealResponse> {
            if self.held.load(Ordering::SeqCst) {
                self.gate
                    .acquire()
                    .await
                    .map_err(|_| ClientError::Transport("backend shut down".into()))?
                    .forget();
            }

            if self.require_reviewer.load(Ordering::SeqCst) && !role.is_reviewer() {
                return Err(ClientError::Forbidden("Reviewer role required".into()));
            }

            let mut state = self.state.lock().await;
            let fault = state.faults.pop_front();

            match &fault {
                Some(RevealFault::Status(status)) => {
                    return Err(ClientError::Status {
                        status: *status,
                        message: "injected failure".into(),
                    })
                }
                Some(RevealFault::Transport) => {
                    return Err(ClientError::Transport("connection reset".into()))
                }
                Some(RevealFault::Panic) => {
                    drop(state);
                    panic!("injected reveal panic");
                }
                _ => {}
            }

            let image = state.images.get(image_id).ok_or_else(|| ClientError::Status {
                status: 404,
                message: "Image not found".into(),
            })?;

            let mut response = RevealResponse::default();
            for id in &request.region_ids {
                let Some(patch) = image.patches.get(id) else {
                    continue;
                };
                let kind = image
                    .regions
                    .iter()
                    .find(|r| r.id.as_ref() == Some(id))
                    .map(|r| r.kind.clone());
                let image_base64 = match &fault {
                    Some(RevealFault::OmitContent) => None,
                    Some(RevealFault::Garbage) => Some("data:image/png;base64,%%%".to_string()),
                    _ => Some(patch.clone()),
                };
                response.insert(id.clone(), RevealedEntry { image_base64, kind });
            }

            if response.is_empty() && fault.is_none() {
                return Err(ClientError::Status {
                    status: 404,
                    message: "No matching regions".into(),
                });
            }

            Ok(response)
        }
    }

    impl Default for MemoryBackend {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Backend for MemoryBackend {
        async fn ingest(&self, _upload: Upload) -> Result<IngestResponse> {
            let mut state = self.state.lock().await;
            if let Some(error) = state.ingest_fault.take() {
                return Err(error);
            }

            let image = state.staged.pop_front().ok_or_else(|| ClientError::Status {
                status: 400,
                message: "Unsupported image format".into(),
            })?;

            let response = IngestResponse {
                image_id: image.image_id.clone(),
                status: Some("processed".into()),
                regions: image.regions.clone(),
                redacted_url: redacted_path(&image.image_id),
            };
            state.images.insert(image.image_id.clone(), image);
            Ok(response)
        }

        async fn fetch_image(&self, url: &str) -> Result<Bytes> {
            let state = self.state.lock().await;
            state
                .images
                .values()
                .find(|image| url.ends_with(&redacted_path(&image.image_id)))
                .map(|image| image.redacted.clone())
                .ok_or_else(|| ClientError::Status {
                    status: 404,
                    message: "Redacted image missing".into(),
                })
        }

        async fn reveal(
            &self,
            image_id: &ImageId,
            request: &RevealRequest,
            role: Role,
        ) -> Result<RevealResponse> {
            self.record(RevealCall {
                image_id: image_id.clone(),
                region_ids: request.region_ids.clone(),
                role,
            })
            .await;

            let result = self.respond(image_id, request, role).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }

        async fn manifest(&self, image_id: &ImageId) -> Result<Manifest> {
            let state = self.state.lock().await;
            let image = state.images.get(image_id).ok_or_else(|| ClientError::Status {
                status: 404,
                message: "Image not found".into(),
            })?;

            let regions = image
                .regions
                .iter()
                .filter_map(|r| {
                    Some(ManifestRegion {
                        id: r.id.clone()?,
                        kind: r.kind.clone(),
                        polygon: r.polygon.clone(),
                        confidence: r.confidence,
                        sha256: None,
                        iv: None,
                        enc_algo: Some("AES-GCM".into()),
                    })
                })
                .collect();

            Ok(Manifest {
                image_id: image_id.clone(),
                version: Some("memory".into()),
                regions,
                created_at: None,
            })
        }

        fn resolve(&self, reference: &str) -> Result<String> {
            Ok(self.base.join(reference)?.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::{MemoryBackend, RevealFault, StagedImage};
    use super::*;
    use crate::error::ClientError;
    use veil_core::{Polygon, Region, RegionId};

    fn staged() -> StagedImage {
        StagedImage::new("img-1", vec![1u8, 2, 3]).with_region(
            Region::new("face", Polygon::rect(10.0, 10.0, 50.0, 50.0), 0.92).with_id("r1"),
            "data:image/png;base64,AQID",
        )
    }

    #[tokio::test]
    async fn test_memory_ingest_then_reveal() {
        let backend = MemoryBackend::new();
        backend.stage(staged()).await;

        let ingest = backend.ingest(Upload::new("a.png", vec![0u8])).await.unwrap();
        assert_eq!(ingest.image_id.as_str(), "img-1");
        assert_eq!(ingest.redacted_url, "/images/img-1/redacted");

        let request = RevealRequest::single(RegionId::new("r1"));
        let resp = backend
            .reveal(&ingest.image_id, &request, Role::Reviewer)
            .await
            .unwrap();

        assert_eq!(resp.content_for(&RegionId::new("r1")), Some("data:image/png;base64,AQID"));
        assert_eq!(backend.reveal_calls().await, 1);
    }

    #[tokio::test]
    async fn test_memory_reveal_requires_reviewer() {
        let backend = MemoryBackend::new();
        backend.insert(staged()).await;

        let request = RevealRequest::single(RegionId::new("r1"));
        let err = backend
            .reveal(&ImageId::new("img-1"), &request, Role::Viewer)
            .await
            .unwrap_err();

        assert!(err.is_forbidden());
    }

    #[tokio::test]
    async fn test_memory_injected_faults() {
        let backend = MemoryBackend::new();
        backend.insert(staged()).await;
        backend.inject(RevealFault::Status(500)).await;
        backend.inject(RevealFault::OmitContent).await;

        let id = ImageId::new("img-1");
        let request = RevealRequest::single(RegionId::new("r1"));

        let err = backend.reveal(&id, &request, Role::Reviewer).await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 500, .. }));

        let resp = backend.reveal(&id, &request, Role::Reviewer).await.unwrap();
        assert_eq!(resp.content_for(&RegionId::new("r1")), None);

        let resp = backend.reveal(&id, &request, Role::Reviewer).await.unwrap();
        assert!(resp.content_for(&RegionId::new("r1")).is_some());
    }

    #[tokio::test]
    async fn test_memory_ingest_without_staged_image_fails() {
        let backend = MemoryBackend::new();
        let err = backend.ingest(Upload::new("a.png", vec![0u8])).await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_memory_fetch_image_and_manifest() {
        let backend = MemoryBackend::new();
        backend.insert(staged()).await;

        let bytes = backend
            .fetch_image("http://localhost:8000/images/img-1/redacted")
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), &[1, 2, 3]);

        let manifest = backend.manifest(&ImageId::new("img-1")).await.unwrap();
        assert_eq!(manifest.regions.len(), 1);
        assert_eq!(manifest.regions[0].id, RegionId::new("r1"));
    }

    #[test]
    fn test_memory_resolve_against_base() {
        let backend = MemoryBackend::new();
        assert_eq!(
            backend.resolve("/images/img-1/redacted").unwrap(),
            "http://localhost:8000/images/img-1/redacted"
        );

        let backend = MemoryBackend::new().with_base(url::Url::parse("https://redact.example").unwrap());
        assert_eq!(
            backend.resolve("/images/img-1/redacted").unwrap(),
            "https://redact.example/images/img-1/redacted"
        );
    }
}
