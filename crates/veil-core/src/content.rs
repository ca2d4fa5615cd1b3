//! Revealed region content.
//!
//! The backend returns each decrypted patch as a base64 data URL
//! (`data:image/png;base64,...`). We keep the decoded bytes for compositing
//! and the data URL itself for surfaces that can display it directly.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

use crate::error::CoreError;

/// Media type assumed for bare base64 payloads.
pub const DEFAULT_MEDIA_TYPE: &str = "image/png";

/// Decoded content of one revealed region.
#[derive(Clone, PartialEq, Eq)]
pub struct RevealedContent {
    media_type: String,
    bytes: Bytes,
    data_url: String,
}

impl RevealedContent {
    /// Parse a base64 data URL, or a bare base64 string (taken as PNG).
    pub fn from_data_url(input: &str) -> Result<Self, CoreError> {
        let input = input.trim();

        let (media_type, payload) = match input.strip_prefix("data:") {
            Some(rest) => {
                let (meta, payload) = rest
                    .split_once(',')
                    .ok_or_else(|| CoreError::InvalidContent("data URL has no payload".into()))?;
                let mut params = meta.split(';');
                let media_type = params.next().unwrap_or_default();
                if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
                    return Err(CoreError::InvalidContent(
                        "only base64 data URLs are supported".into(),
                    ));
                }
                let media_type = if media_type.is_empty() {
                    DEFAULT_MEDIA_TYPE
                } else {
                    media_type
                };
                (media_type.to_string(), payload)
            }
            None => (DEFAULT_MEDIA_TYPE.to_string(), input),
        };

        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| CoreError::InvalidContent(format!("base64: {e}")))?;
        if bytes.is_empty() {
            return Err(CoreError::InvalidContent("empty payload".into()));
        }

        let data_url = if input.starts_with("data:") {
            input.to_string()
        } else {
            format!("data:{media_type};base64,{payload}")
        };

        Ok(Self {
            media_type,
            bytes: Bytes::from(bytes),
            data_url,
        })
    }

    /// Wrap raw bytes, producing the matching data URL.
    pub fn from_bytes(media_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let media_type = media_type.into();
        let bytes = bytes.into();
        let data_url = format!("data:{};base64,{}", media_type, STANDARD.encode(&bytes));
        Self {
            media_type,
            bytes,
            data_url,
        }
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }
}

impl std::fmt::Debug for RevealedContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealedContent")
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_png_data_url() {
        let content = RevealedContent::from_data_url("data:image/png;base64,AQID").unwrap();

        assert_eq!(content.media_type(), "image/png");
        assert_eq!(content.bytes().as_ref(), &[1, 2, 3]);
        assert_eq!(content.data_url(), "data:image/png;base64,AQID");
    }

    #[test]
    fn test_bare_base64_defaults_to_png() {
        let content = RevealedContent::from_data_url("AQID").unwrap();

        assert_eq!(content.media_type(), DEFAULT_MEDIA_TYPE);
        assert_eq!(content.data_url(), "data:image/png;base64,AQID");
    }

    #[test]
    fn test_rejects_non_base64_data_url() {
        let err = RevealedContent::from_data_url("data:text/plain,hello").unwrap_err();
        assert!(matches!(err, CoreError::InvalidContent(_)));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(RevealedContent::from_data_url("data:image/png;base64,@@@").is_err());
        assert!(RevealedContent::from_data_url("").is_err());
    }

    #[test]
    fn test_from_bytes_matches_parse() {
        let built = RevealedContent::from_bytes("image/jpeg", vec![9u8, 8, 7]);
        let parsed = RevealedContent::from_data_url(built.data_url()).unwrap();

        assert_eq!(built, parsed);
    }

    #[test]
    fn test_debug_hides_payload() {
        let content = RevealedContent::from_bytes("image/png", vec![0u8; 64]);
        let debug = format!("{:?}", content);
        assert!(debug.contains("len: 64"));
        assert!(!debug.contains("base64"));
    }
}
