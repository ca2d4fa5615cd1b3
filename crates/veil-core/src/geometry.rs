//! Overlay geometry: polygon to resolution-independent bounding box.
//!
//! Boxes are normalized by the image's intrinsic dimensions, never by the
//! size it happens to be displayed at, so the overlay stays aligned at any
//! display scale.

use serde::{Deserialize, Serialize};

use crate::region::{ImageDimensions, Polygon};

/// Axis-aligned bounding box in the original image's pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelBounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Polygon {
    /// Bounding box of all vertices.
    ///
    /// An empty polygon yields a zero-size box at the origin.
    pub fn bounds(&self) -> PixelBounds {
        let mut points = self.points().iter();
        let Some(first) = points.next() else {
            return PixelBounds::default();
        };

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        PixelBounds {
            left: min_x,
            top: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }
}

/// Bounding box as fractions of the image width and height.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OverlayBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl OverlayBox {
    /// Whether the box has no area (a point- or line-sized region).
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// `left`, `top`, `width`, `height` as percentages, for CSS-style
    /// absolute positioning.
    pub fn css_percentages(&self) -> [f64; 4] {
        [
            self.left * 100.0,
            self.top * 100.0,
            self.width * 100.0,
            self.height * 100.0,
        ]
    }

    /// Map back onto an integer pixel rectangle of an image with `dims`,
    /// clipped to the image.
    pub fn to_pixels(&self, dims: ImageDimensions) -> PixelRect {
        let (w, h) = (dims.width() as f64, dims.height() as f64);

        let x0 = (self.left * w).floor().clamp(0.0, w);
        let y0 = (self.top * h).floor().clamp(0.0, h);
        let x1 = ((self.left + self.width) * w).ceil().clamp(x0, w);
        let y1 = ((self.top + self.height) * h).ceil().clamp(y0, h);

        PixelRect {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        }
    }
}

/// Integer pixel rectangle, used when compositing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Convert a region polygon into an overlay box.
///
/// Pure and deterministic. A degenerate polygon yields a zero-size box
/// rather than an error. `dims` cannot be zero, so the division is always
/// defined; callers obtain it only once the base image has been decoded.
pub fn to_overlay_box(polygon: &Polygon, dims: ImageDimensions) -> OverlayBox {
    let bounds = polygon.bounds();
    let (w, h) = (dims.width() as f64, dims.height() as f64);

    OverlayBox {
        left: bounds.left / w,
        top: bounds.top / h,
        width: bounds.width / w,
        height: bounds.height / h,
    }
}
