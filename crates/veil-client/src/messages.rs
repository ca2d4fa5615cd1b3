//! Wire messages exchanged with the redaction backend.
//!
//! Field names follow the backend's JSON exactly (`image_id`, `region_ids`,
//! `image_base64`, `type`).

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use veil_core::{ImageId, Polygon, Region, RegionId};

/// An image file to upload.
#[derive(Debug, Clone)]
pub struct Upload {
    /// File name sent with the multipart part.
    pub file_name: String,
    /// MIME type of the file, if known.
    pub media_type: Option<String>,
    /// Raw file contents.
    pub bytes: Bytes,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

/// Response to an ingest (upload) request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub image_id: ImageId,
    /// Processing status; the backend reports `processed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub regions: Vec<Region>,
    /// Reference to the redacted image, possibly relative to the API base.
    pub redacted_url: String,
}

/// Body of a reveal (decrypt) request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealRequest {
    pub region_ids: Vec<RegionId>,
}

impl RevealRequest {
    /// Request scoped to exactly one region.
    pub fn single(id: RegionId) -> Self {
        Self {
            region_ids: vec![id],
        }
    }
}

/// Revealed payload for one region.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RevealedEntry {
    /// Data URL of the decrypted patch. Optional on the wire so that one
    /// malformed entry does not invalidate the whole response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Response to a reveal request, keyed by region id.
///
/// Requested ids the backend did not return are simply absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevealResponse(pub HashMap<RegionId, RevealedEntry>);

impl RevealResponse {
    /// The content string for `id`, if present and non-empty.
    pub fn content_for(&self, id: &RegionId) -> Option<&str> {
        self.0
            .get(id)
            .and_then(|entry| entry.image_base64.as_deref())
            .filter(|s| !s.is_empty())
    }

    pub fn insert(&mut self, id: RegionId, entry: RevealedEntry) {
        self.0.insert(id, entry);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-region record in an image manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRegion {
    pub id: RegionId,
    #[serde(rename = "type")]
    pub kind: String,
    pub polygon: Polygon,
    pub confidence: f64,
    /// Hex digest of the plaintext patch.
    #[serde(default)]
    pub sha256: Option<String>,
    /// Hex-encoded IV of the encrypted patch.
    #[serde(default)]
    pub iv: Option<String>,
    #[serde(default)]
    pub enc_algo: Option<String>,
}

impl ManifestRegion {
    /// View this record as a session region. Manifest regions always carry an id.
    pub fn to_region(&self) -> Region {
        Region::new(self.kind.clone(), self.polygon.clone(), self.confidence).with_id(self.id.clone())
    }
}

/// Stored description of a previously ingested image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub image_id: ImageId,
    #[serde(default)]
    pub version: Option<String>,
    pub regions: Vec<ManifestRegion>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Manifest {
    pub fn regions(&self) -> Vec<Region> {
        self.regions.iter().map(ManifestRegion::to_region).collect()
    }
}

/// Path of the redacted image for `image_id`, relative to the API base.
pub fn redacted_path(image_id: &ImageId) -> String {
    format!("/images/{}/redacted", image_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_response_tolerates_missing_ids() {
        let json = r#"{
            "image_id": "abc",
            "status": "processed",
            "regions": [
                {"type": "face", "polygon": [[10,10],[50,10],[50,50],[10,50]], "confidence": 0.92},
                {"type": "email", "polygon": [[0,0],[4,0],[4,4]], "confidence": 0.5, "id": "r2"}
            ],
            "redacted_url": "/images/abc/redacted"
        }"#;

        let resp: IngestResponse = serde_json::from_str(json).unwrap();

        assert_eq!(resp.image_id.as_str(), "abc");
        assert_eq!(resp.status.as_deref(), Some("processed"));
        assert!(resp.regions[0].id.is_none());
        assert_eq!(resp.regions[1].id, Some(RegionId::new("r2")));
    }

    #[test]
    fn test_reveal_request_wire_format() {
        let req = RevealRequest::single(RegionId::new("r1"));
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"region_ids":["r1"]}"#);
    }

    #[test]
    fn test_reveal_response_lookup() {
        let json = r#"{
            "r1": {"type": "face", "image_base64": "data:image/png;base64,AQID"},
            "r2": {"type": "email"},
            "r3": {"image_base64": ""}
        }"#;

        let resp: RevealResponse = serde_json::from_str(json).unwrap();

        assert_eq!(resp.content_for(&RegionId::new("r1")), Some("data:image/png;base64,AQID"));
        assert_eq!(resp.content_for(&RegionId::new("r2")), None);
        assert_eq!(resp.content_for(&RegionId::new("r3")), None);
        assert_eq!(resp.content_for(&RegionId::new("r4")), None);
    }

    #[test]
    fn test_manifest_regions_carry_ids() {
        let json = r#"{
            "image_id": "abc",
            "version": "pii-poc-0.1.0",
            "regions": [{
                "id": "9f1c", "type": "face", "sha256": "00", "iv": "11",
                "enc_algo": "AES-GCM", "confidence": 0.8,
                "polygon": [[1,1],[3,1],[3,3],[1,3]]
            }],
            "created_at": "2024-01-01T00:00:00Z"
        }"#;

        let manifest: Manifest = serde_json::from_str(json).unwrap();
        let regions = manifest.regions();

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].id, Some(RegionId::new("9f1c")));
        assert_eq!(regions[0].kind, "face");
    }

    #[test]
    fn test_redacted_path() {
        assert_eq!(redacted_path(&ImageId::new("abc")), "/images/abc/redacted");
    }
}
