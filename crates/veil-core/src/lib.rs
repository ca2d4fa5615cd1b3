//! # Veil Core
//!
//! Pure primitives for the Veil viewer: regions, sessions, overlay geometry,
//! and revealed content.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over the data the redaction backend hands us.
//!
//! ## Key Types
//!
//! - [`Region`] - One detected sensitive area (category, polygon, confidence, id)
//! - [`ImageSession`] - The currently loaded image and its regions
//! - [`OverlayBox`] - A region's bounding box as fractions of the image size
//! - [`RevealedContent`] - A decrypted region patch
//!
//! ## Geometry
//!
//! Overlay boxes are always normalized by the image's intrinsic dimensions.
//! See the [`geometry`] module.

pub mod content;
pub mod error;
pub mod geometry;
pub mod region;
pub mod types;
pub mod validation;

pub use content::RevealedContent;
pub use error::{CoreError, ValidationError};
pub use geometry::{to_overlay_box, OverlayBox, PixelBounds, PixelRect};
pub use region::{ImageDimensions, ImageSession, Point, Polygon, Region, MIN_POLYGON_POINTS};
pub use types::{ImageId, RegionId, Role};
pub use validation::{sanitize_regions, validate_region, SanitizedRegions};
