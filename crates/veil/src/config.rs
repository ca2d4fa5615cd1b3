//! Viewer configuration.

use std::time::Duration;

use url::Url;
use veil_client::ClientConfig;

use crate::error::{Result, ViewerError};

/// Environment variable holding the API base URL.
pub const API_BASE_ENV: &str = "VEIL_API_BASE";

/// Configuration for the Viewer.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Origin of the redaction API. Relative image references resolve against it.
    pub api_base: Url,
    /// Timeout applied to every backend request.
    pub request_timeout: Duration,
    /// Name of the header that carries the Reviewer role.
    pub role_header: String,
    /// Load the redacted base image right after an upload or open, so that
    /// overlays can be placed without a separate call.
    pub load_base_image: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let client = ClientConfig::default();
        Self {
            api_base: client.api_base,
            request_timeout: client.request_timeout,
            role_header: client.role_header,
            load_base_image: true,
        }
    }
}

impl ViewerConfig {
    /// Defaults, with the API base taken from `VEIL_API_BASE` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup(API_BASE_ENV) {
            let raw = raw.trim();
            if !raw.is_empty() {
                config.api_base = parse_api_base(raw)?;
            }
        }
        Ok(config)
    }

    /// Settings for the HTTP backend.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_base: self.api_base.clone(),
            request_timeout: self.request_timeout,
            role_header: self.role_header.clone(),
            ..ClientConfig::default()
        }
    }
}

fn parse_api_base(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| ViewerError::Config(format!("{API_BASE_ENV}={raw:?}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ViewerError::Config(format!(
            "{API_BASE_ENV}={raw:?} cannot be used as a base URL"
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_client::{DEFAULT_API_BASE, DEFAULT_ROLE_HEADER};

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.api_base.as_str(), "http://localhost:8000/");
        assert_eq!(config.role_header, DEFAULT_ROLE_HEADER);
        assert!(config.load_base_image);
        assert_eq!(Url::parse(DEFAULT_API_BASE).unwrap(), config.api_base);
    }

    #[test]
    fn test_from_lookup_overrides_base() {
        let config = ViewerConfig::from_lookup(|key| {
            (key == API_BASE_ENV).then(|| "https://redact.example:9000".to_string())
        })
        .unwrap();
        assert_eq!(config.api_base.as_str(), "https://redact.example:9000/");
        assert_eq!(config.client_config().api_base, config.api_base);
    }

    #[test]
    fn test_from_lookup_ignores_blank() {
        let config = ViewerConfig::from_lookup(|_| Some("  ".to_string())).unwrap();
        assert_eq!(config.api_base.as_str(), "http://localhost:8000/");
    }

    #[test]
    fn test_invalid_base_is_config_error() {
        let err = ViewerConfig::from_lookup(|_| Some("not a url".to_string())).unwrap_err();
        assert!(matches!(err, ViewerError::Config(_)));

        let err = ViewerConfig::from_lookup(|_| Some("mailto:someone".to_string())).unwrap_err();
        assert!(matches!(err, ViewerError::Config(_)));
    }
}
