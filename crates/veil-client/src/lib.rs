//! # Veil Client
//!
//! Boundary to the redaction backend that detects, redacts, and decrypts
//! image regions.
//!
//! ## Overview
//!
//! The viewer never talks HTTP directly. It holds a [`Backend`] and issues
//! four kinds of call: ingest an upload, fetch the redacted image, reveal
//! regions, and read a stored manifest. [`HttpBackend`] speaks to the real
//! service; [`MemoryBackend`] serves staged images for tests and demos.
//!
//! ## Key Types
//!
//! - [`Backend`] - Async trait implemented by every backend
//! - [`HttpBackend`] / [`ClientConfig`] - `reqwest` implementation and its settings
//! - [`MemoryBackend`] - In-process implementation with fault injection
//! - [`RevealRequest`] / [`RevealResponse`] - Decrypt call, keyed by region id
//! - [`ClientError`] - Forbidden, status, transport, malformed
//!
//! ## Usage
//!
//! ```rust,no_run
//! use veil_client::{Backend, ClientConfig, HttpBackend, RevealRequest};
//! use veil_core::{ImageId, RegionId, Role};
//!
//! async fn example() -> veil_client::Result<()> {
//!     let backend = HttpBackend::new(ClientConfig::default())?;
//!     let request = RevealRequest::single(RegionId::new("r1"));
//!     let response = backend
//!         .reveal(&ImageId::new("abc"), &request, Role::Reviewer)
//!         .await?;
//!     println!("{} regions revealed", response.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **403 is distinct**: authorization denials surface as
//!   [`ClientError::Forbidden`], never as a generic status
//! - **Partial responses**: requested regions missing from a reveal response
//!   are absent from the map, not errors
//! - **Role is advisory**: the role header is asserted by the client and
//!   enforced by the backend

pub mod backend;
pub mod error;
pub mod http;
pub mod messages;

pub use backend::memory::{MemoryBackend, RevealCall, RevealFault, StagedImage};
pub use backend::Backend;
pub use error::{ClientError, Result};
pub use http::{ClientConfig, HttpBackend, DEFAULT_API_BASE, DEFAULT_ROLE_HEADER};
pub use messages::{
    redacted_path, IngestResponse, Manifest, ManifestRegion, RevealRequest, RevealResponse,
    RevealedEntry, Upload,
};
