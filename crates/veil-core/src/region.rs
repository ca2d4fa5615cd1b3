//! Regions and image sessions.
//!
//! A session is the currently loaded image: its identity, the redacted base
//! image, its intrinsic dimensions once known, and the regions the backend
//! detected. Regions are immutable once received.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::types::{ImageId, RegionId};

/// A vertex in the original image's pixel space.
///
/// Serialized as a two-element array `[x, y]`, matching the backend wire format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Minimum number of vertices for a well-formed polygon.
pub const MIN_POLYGON_POINTS: usize = 3;

/// An ordered sequence of vertices in pixel space.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon(Vec<Point>);

impl Polygon {
    /// Wrap a vertex list. Well-formedness is checked by
    /// [`validate_region`](crate::validation::validate_region).
    pub fn from_points(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Axis-aligned rectangle as a four-vertex polygon.
    pub fn rect(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self(vec![
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        ])
    }

    pub fn points(&self) -> &[Point] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<[f64; 2]>> for Polygon {
    fn from(points: Vec<[f64; 2]>) -> Self {
        Self(points.into_iter().map(Point::from).collect())
    }
}

/// One detected sensitive area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Category label, e.g. a PII class such as `face` or `email`.
    #[serde(rename = "type")]
    pub kind: String,
    pub polygon: Polygon,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,
    /// Identifier unique within the session. Regions without one are view-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RegionId>,
}

impl Region {
    pub fn new(kind: impl Into<String>, polygon: Polygon, confidence: f64) -> Self {
        Self {
            kind: kind.into(),
            polygon,
            confidence,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<RegionId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Whether this region can be revealed at all.
    pub fn is_revealable(&self) -> bool {
        self.id.is_some()
    }

    /// Tooltip label: category and confidence rounded to a whole percent.
    pub fn label(&self) -> String {
        format!("{} ({}%)", self.kind, (self.confidence * 100.0).round() as i64)
    }
}

/// Intrinsic pixel dimensions of the original image.
///
/// Both sides are non-zero by construction, which is what makes overlay
/// normalization total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDimensions {
    width: NonZeroU32,
    height: NonZeroU32,
}

impl ImageDimensions {
    /// Returns `None` if either side is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            width: NonZeroU32::new(width)?,
            height: NonZeroU32::new(height)?,
        })
    }

    pub fn width(&self) -> u32 {
        self.width.get()
    }

    pub fn height(&self) -> u32 {
        self.height.get()
    }
}

/// The currently loaded image.
///
/// Sessions are replaced wholesale, never patched. The only field that is
/// filled in after creation is `dimensions`, and only through the store,
/// which hands out a fresh session value when it does so.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSession {
    pub image_id: ImageId,
    /// Absolute reference to the redacted base image.
    pub redacted_url: String,
    pub regions: Vec<Region>,
    /// Known once the base image has been decoded.
    pub dimensions: Option<ImageDimensions>,
}

impl ImageSession {
    pub fn new(image_id: ImageId, redacted_url: impl Into<String>, regions: Vec<Region>) -> Self {
        Self {
            image_id,
            redacted_url: redacted_url.into(),
            regions,
            dimensions: None,
        }
    }

    pub fn with_dimensions(mut self, dimensions: ImageDimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Find a region by identifier.
    pub fn region(&self, id: &RegionId) -> Option<&Region> {
        self.regions.iter().find(|r| r.id.as_ref() == Some(id))
    }

    /// Whether `id` belongs to this session's region set.
    pub fn contains(&self, id: &RegionId) -> bool {
        self.region(id).is_some()
    }

    /// Identifiers of every revealable region, in region order.
    pub fn region_ids(&self) -> impl Iterator<Item = &RegionId> {
        self.regions.iter().filter_map(|r| r.id.as_ref())
    }
}
