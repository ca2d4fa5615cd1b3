//! HTTP backend over `reqwest`.
//!
//! Endpoints, relative to the configured API base:
//!
//! ```text
//! POST /ingest                       multipart `file`      -> IngestResponse
//! GET  /images/{id}/redacted                               -> image bytes
//! POST /images/{id}/decrypt          {"region_ids": [...]} -> RevealResponse
//! GET  /images/{id}/manifest                               -> Manifest
//! ```

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use tracing::{debug, warn};
use url::Url;

use veil_core::{ImageId, Role};

use crate::backend::Backend;
use crate::error::{ClientError, Result};
use crate::messages::{IngestResponse, Manifest, RevealRequest, RevealResponse, Upload};

/// Default API origin, matching the backend's development server.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Header carrying the asserted role.
pub const DEFAULT_ROLE_HEADER: &str = "X-Role";

/// Configuration for the HTTP backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Origin of the redaction API.
    pub api_base: Url,
    /// Timeout applied to every request.
    pub request_timeout: Duration,
    /// Name of the header that conveys the role.
    pub role_header: String,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL"),
            request_timeout: Duration::from_secs(30),
            role_header: DEFAULT_ROLE_HEADER.to_string(),
            user_agent: concat!("veil/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Backend that talks to the redaction API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpBackend {
    /// Build a client for the configured API base.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// API URL built from path segments appended to the base path.
    /// Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl("API base cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn image_endpoint(&self, image_id: &ImageId, action: &str) -> Result<Url> {
        self.endpoint(&["images", image_id.as_str(), action])
    }
}

/// Map a non-success response to the error taxonomy. 403 is kept apart from
/// every other status.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    if status == StatusCode::FORBIDDEN {
        return Err(ClientError::Forbidden(detail(&message)));
    }
    Err(ClientError::Status {
        status: status.as_u16(),
        message: detail(&message),
    })
}

/// Extract `detail` from an error body if it is JSON, else use the raw text.
fn detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl Backend for HttpBackend {
    async fn ingest(&self, upload: Upload) -> Result<IngestResponse> {
        let url = self.endpoint(&["ingest"])?;
        debug!(%url, file = %upload.file_name, bytes = upload.bytes.len(), "uploading image");

        let mut part = Part::stream(upload.bytes).file_name(upload.file_name);
        if let Some(media_type) = upload.media_type {
            part = part.mime_str(&media_type)?;
        }
        let form = Form::new().part("file", part);

        let response = self.client.post(url).multipart(form).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn fetch_image(&self, url: &str) -> Result<Bytes> {
        let response = self.client.get(url).send().await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?)
    }

    async fn reveal(
        &self,
        image_id: &ImageId,
        request: &RevealRequest,
        role: Role,
    ) -> Result<RevealResponse> {
        let url = self.image_endpoint(image_id, "decrypt")?;

        let mut builder = self.client.post(url).json(request);
        if let Some(value) = role.header_value() {
            builder = builder.header(self.config.role_header.as_str(), value);
        }

        let response = builder.send().await?;
        let response = match check_status(response).await {
            Ok(r) => r,
            Err(e) => {
                if !e.is_forbidden() {
                    warn!(image_id = %image_id, error = %e, "reveal request failed");
                }
                return Err(e);
            }
        };

        response
            .json()
            .await
            .map_err(|e| ClientError::Malformed(e.to_string()))
    }

    async fn manifest(&self, image_id: &ImageId) -> Result<Manifest> {
        let url = self.image_endpoint(image_id, "manifest")?;
        let response = self.client.get(url).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    fn resolve(&self, reference: &str) -> Result<String> {
        Ok(self.config.api_base.join(reference)?.to_string())
    }
}
