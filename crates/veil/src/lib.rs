//! # Veil
//!
//! Viewer for selectively redacted images: draws an overlay per detected
//! region and reveals regions one at a time, gated by the Reviewer role.
//!
//! ## Overview
//!
//! A user uploads an image. The backend detects sensitive regions, returns a
//! redacted copy plus per-region geometry, and later decrypts individual
//! regions for callers asserting the Reviewer role. This crate is the
//! client-side state machine:
//!
//! - **Sessions**: each upload replaces the current image wholesale
//! - **Overlays**: region polygons become resolution-independent boxes
//! - **Reveals**: per-region Redacted → Pending → Revealed, with denials and
//!   failures returning the region to Redacted
//! - **Staleness**: results that arrive after a new upload are discarded
//!
//! ## Usage
//!
//! ```rust,no_run
//! use veil::{RevealOutcome, Viewer};
//!
//! async fn example() -> veil::Result<()> {
//!     // Talk to the backend named by VEIL_API_BASE
//!     let viewer = Viewer::from_env()?;
//!
//!     // Upload an image; overlays appear once the base image is decoded
//!     viewer.upload_path("photo.png").await?;
//!
//!     // Reveal the first region as a reviewer
//!     viewer.set_reviewer(true).await;
//!     match viewer.click(0).await {
//!         RevealOutcome::Revealed { content, .. } => println!("{} bytes", content.bytes().len()),
//!         other => println!("not revealed: {other:?}"),
//!     }
//!
//!     // Draw it
//!     let scene = viewer.render().await;
//!     let pixels = viewer.compose().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `veil::core` - Regions, geometry, revealed content
//! - `veil::store` - Region Store and Reveal Cache
//! - `veil::client` - Backend trait, HTTP and in-memory backends

pub mod config;
pub mod controller;
pub mod error;
mod state;
pub mod surface;
pub mod viewer;

// Re-export component crates
pub use veil_client as client;
pub use veil_core as core;
pub use veil_store as store;

// Re-export main types for convenience
pub use config::{ViewerConfig, API_BASE_ENV};
pub use controller::{Notice, RevealController, RevealOutcome, RevealState};
pub use error::{Result, ViewerError};
pub use surface::{compose, render, OutlineStyle, Overlay, Scene, OUTLINE_COLOR};
pub use viewer::Viewer;

// Re-export commonly used component types
pub use veil_client::{Backend, HttpBackend, MemoryBackend, StagedImage, Upload};
pub use veil_core::{
    ImageDimensions, ImageId, ImageSession, OverlayBox, Polygon, Region, RegionId,
    RevealedContent, Role,
};
pub use veil_store::SessionEpoch;
