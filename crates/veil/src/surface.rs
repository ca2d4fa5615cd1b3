//! The viewer surface: overlays laid over the redacted base image.
//!
//! [`render`] produces a [`Scene`], a pure description an embedding UI can
//! draw however it likes. [`compose`] rasterises a scene onto the decoded base
//! image for callers that want pixels.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tracing::warn;
use veil_core::{
    to_overlay_box, ImageDimensions, ImageId, ImageSession, OverlayBox, PixelRect, RegionId,
    RevealedContent,
};
use veil_store::RevealCache;

use crate::controller::RevealState;

/// Outline colour of every region (#22c55e).
pub const OUTLINE_COLOR: Rgba<u8> = Rgba([0x22, 0xc5, 0x5e, 0xff]);

/// Stroke style of a region outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutlineStyle {
    pub color: Rgba<u8>,
    /// Stroke width in pixels.
    pub thickness: u32,
    /// Length of each dash and each gap, in pixels.
    pub dash: u32,
}

impl Default for OutlineStyle {
    fn default() -> Self {
        Self {
            color: OUTLINE_COLOR,
            thickness: 2,
            dash: 6,
        }
    }
}

impl OutlineStyle {
    /// `#rrggbb` form of the colour.
    pub fn css_color(&self) -> String {
        let [r, g, b, _] = self.color.0;
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

/// One region as drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    /// Position of the region in the session's region list.
    pub index: usize,
    /// `None` for view-only regions.
    pub region_id: Option<RegionId>,
    /// Tooltip text, e.g. `face (92%)`.
    pub label: String,
    pub bounds: OverlayBox,
    pub outline: OutlineStyle,
    pub state: RevealState,
    /// Revealed content drawn inside the box.
    pub content: Option<RevealedContent>,
}

impl Overlay {
    /// Whether clicking this overlay requests a reveal.
    pub fn is_clickable(&self) -> bool {
        self.region_id.is_some()
    }
}

/// Description of the whole viewer surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub image_id: ImageId,
    /// Absolute URL of the redacted base image.
    pub base_url: String,
    /// Intrinsic dimensions, once the base image has been decoded.
    pub dimensions: Option<ImageDimensions>,
    /// One per region, in region order. Empty until dimensions are known.
    pub overlays: Vec<Overlay>,
}

impl Scene {
    pub fn overlay(&self, index: usize) -> Option<&Overlay> {
        self.overlays.get(index)
    }

    /// The overlay of region `id`.
    pub fn overlay_for(&self, id: &RegionId) -> Option<&Overlay> {
        self.overlays
            .iter()
            .find(|o| o.region_id.as_ref() == Some(id))
    }
}

/// Build the scene for `session`.
///
/// Without intrinsic dimensions there is nothing to place overlays against,
/// so the scene carries only the base image.
pub fn render(
    session: &ImageSession,
    cache: &RevealCache,
    phase: impl Fn(&RegionId) -> RevealState,
) -> Scene {
    let overlays = match session.dimensions {
        None => Vec::new(),
        Some(dims) => session
            .regions
            .iter()
            .enumerate()
            .map(|(index, region)| {
                let id = region.id.as_ref();
                Overlay {
                    index,
                    region_id: region.id.clone(),
                    label: region.label(),
                    bounds: to_overlay_box(&region.polygon, dims),
                    outline: OutlineStyle::default(),
                    state: id.map(&phase).unwrap_or_default(),
                    content: id.and_then(|id| cache.get(id)).cloned(),
                }
            })
            .collect(),
    };

    Scene {
        image_id: session.image_id.clone(),
        base_url: session.redacted_url.clone(),
        dimensions: session.dimensions,
        overlays,
    }
}

/// Rasterise `scene` on top of `base`.
///
/// Revealed patches are scaled to cover their box. Patches that fail to
/// decode are skipped with a warning, leaving the redacted pixels visible.
pub fn compose(base: &RgbaImage, scene: &Scene) -> RgbaImage {
    let mut canvas = base.clone();
    let Some(dims) = ImageDimensions::new(base.width(), base.height()) else {
        return canvas;
    };

    for overlay in &scene.overlays {
        let rect = overlay.bounds.to_pixels(dims);
        if let Some(content) = &overlay.content {
            draw_patch(&mut canvas, rect, content, overlay.index);
        }
        let outline = outline_rect(rect, overlay.outline.thickness, dims);
        draw_dashed_outline(&mut canvas, outline, overlay.outline);
    }
    canvas
}

/// Grow `rect` to at least `thickness` pixels per axis, kept inside the image,
/// so point and line regions still get a visible outline.
fn outline_rect(rect: PixelRect, thickness: u32, dims: ImageDimensions) -> PixelRect {
    let min = thickness.max(1);
    let width = rect.width.max(min).min(dims.width());
    let height = rect.height.max(min).min(dims.height());
    PixelRect {
        x: rect.x.min(dims.width() - width),
        y: rect.y.min(dims.height() - height),
        width,
        height,
    }
}

fn draw_patch(canvas: &mut RgbaImage, rect: PixelRect, content: &RevealedContent, index: usize) {
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    let patch = match image::load_from_memory(content.bytes()) {
        Ok(patch) => patch,
        Err(e) => {
            warn!(index, error = %e, "skipping undecodable revealed patch");
            return;
        }
    };
    let patch = patch
        .resize_exact(rect.width, rect.height, FilterType::Triangle)
        .to_rgba8();
    imageops::replace(canvas, &patch, i64::from(rect.x), i64::from(rect.y));
}

/// Dashed rectangle drawn inward from the edge of `rect`.
fn draw_dashed_outline(canvas: &mut RgbaImage, rect: PixelRect, style: OutlineStyle) {
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    let (img_w, img_h) = canvas.dimensions();
    let x0 = rect.x;
    let y0 = rect.y;
    let x1 = (rect.x + rect.width - 1).min(img_w.saturating_sub(1));
    let y1 = (rect.y + rect.height - 1).min(img_h.saturating_sub(1));
    let dash = style.dash.max(1);
    let on = |offset: u32| (offset / dash) % 2 == 0;

    for t in 0..style.thickness.max(1) {
        let (tx0, ty0) = (x0 + t, y0 + t);
        let (Some(tx1), Some(ty1)) = (x1.checked_sub(t), y1.checked_sub(t)) else {
            break;
        };
        if tx0 > tx1 || ty0 > ty1 {
            break;
        }
        for x in tx0..=tx1 {
            if on(x - x0) {
                canvas.put_pixel(x, ty0, style.color);
                canvas.put_pixel(x, ty1, style.color);
            }
        }
        for y in ty0..=ty1 {
            if on(y - y0) {
                canvas.put_pixel(tx0, y, style.color);
                canvas.put_pixel(tx1, y, style.color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::ops::RangeInclusive;

    use image::ImageFormat;
    use veil_core::{Polygon, Region};

    fn session(dims: Option<ImageDimensions>) -> ImageSession {
        let session = ImageSession::new(
            ImageId::new("abc"),
            "http://localhost:8000/images/abc/redacted",
            vec![
                Region::new("face", Polygon::rect(10.0, 10.0, 50.0, 50.0), 0.92).with_id("r1"),
                Region::new("email", Polygon::rect(60.0, 60.0, 90.0, 70.0), 0.5),
            ],
        );
        match dims {
            Some(d) => session.with_dimensions(d),
            None => session,
        }
    }

    fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_no_overlays_without_dimensions() {
        let scene = render(&session(None), &RevealCache::new(), |_| RevealState::Redacted);
        assert!(scene.overlays.is_empty());
        assert_eq!(scene.base_url, "http://localhost:8000/images/abc/redacted");
    }

    #[test]
    fn test_overlays_in_region_order() {
        let dims = ImageDimensions::new(100, 100).unwrap();
        let scene = render(&session(Some(dims)), &RevealCache::new(), |_| RevealState::Pending);

        assert_eq!(scene.overlays.len(), 2);
        let first = &scene.overlays[0];
        assert_eq!(first.label, "face (92%)");
        assert!((first.bounds.left - 0.10).abs() < 1e-9);
        assert!((first.bounds.width - 0.40).abs() < 1e-9);
        assert_eq!(first.state, RevealState::Pending);
        assert!(first.is_clickable());

        let second = &scene.overlays[1];
        assert_eq!(second.label, "email (50%)");
        assert!(!second.is_clickable());
        assert_eq!(second.state, RevealState::Redacted);
    }

    #[test]
    fn test_cached_content_is_attached() {
        let dims = ImageDimensions::new(100, 100).unwrap();
        let mut cache = RevealCache::new();
        let content = RevealedContent::from_bytes("image/png", png(4, 4, [255, 0, 0, 255]));
        cache.put(RegionId::new("r1"), content.clone());

        let scene = render(&session(Some(dims)), &cache, |_| RevealState::Revealed);
        let overlay = scene.overlay_for(&RegionId::new("r1")).unwrap();
        assert_eq!(overlay.content.as_ref(), Some(&content));
    }

    #[test]
    fn test_outline_style_defaults() {
        let style = OutlineStyle::default();
        assert_eq!(style.css_color(), "#22c55e");
        assert_eq!(style.thickness, 2);
    }

    #[test]
    fn test_compose_paints_patch_and_outline() {
        let dims = ImageDimensions::new(100, 100).unwrap();
        let mut cache = RevealCache::new();
        cache.put(
            RegionId::new("r1"),
            RevealedContent::from_bytes("image/png", png(4, 4, [255, 0, 0, 255])),
        );
        let scene = render(&session(Some(dims)), &cache, |_| RevealState::Revealed);
        let base = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));

        let out = compose(&base, &scene);

        assert_eq!(out.dimensions(), (100, 100));
        // Interior of the revealed box carries the patch colour.
        assert_eq!(out.get_pixel(30, 30), &Rgba([255, 0, 0, 255]));
        // Top-left corner of each box starts a dash.
        assert_eq!(out.get_pixel(10, 10), &OUTLINE_COLOR);
        assert_eq!(out.get_pixel(60, 60), &OUTLINE_COLOR);
        // The view-only box interior stays redacted.
        assert_eq!(out.get_pixel(75, 65), &Rgba([0, 0, 0, 255]));
        // Outside every box is untouched.
        assert_eq!(out.get_pixel(95, 5), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_compose_outline_is_dashed() {
        let dims = ImageDimensions::new(100, 100).unwrap();
        let scene = render(&session(Some(dims)), &RevealCache::new(), |_| RevealState::Redacted);
        let base = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));

        let out = compose(&base, &scene);

        // Dash of 6 on, 6 off along the top edge starting at x = 10.
        assert_eq!(out.get_pixel(15, 10), &OUTLINE_COLOR);
        assert_eq!(out.get_pixel(16, 10), &Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(22, 10), &OUTLINE_COLOR);
    }

    #[test]
    fn test_compose_skips_undecodable_patch() {
        let dims = ImageDimensions::new(100, 100).unwrap();
        let mut cache = RevealCache::new();
        cache.put(RegionId::new("r1"), RevealedContent::from_bytes("image/png", vec![1, 2, 3]));
        let scene = render(&session(Some(dims)), &cache, |_| RevealState::Revealed);
        let base = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));

        let out = compose(&base, &scene);
        assert_eq!(out.get_pixel(30, 30), &Rgba([0, 0, 0, 255]));
    }

    fn outline_pixels(img: &RgbaImage, xs: RangeInclusive<u32>, ys: RangeInclusive<u32>) -> usize {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .filter(|&(x, y)| img.get_pixel(x, y) == &OUTLINE_COLOR)
            .count()
    }

    #[test]
    fn test_compose_draws_point_and_line_regions() {
        let dims = ImageDimensions::new(20, 20).unwrap();
        let session = ImageSession::new(
            ImageId::new("thin"),
            "http://localhost:8000/images/thin/redacted",
            vec![
                Region::new("dot", Polygon::from(vec![[7.0, 9.0], [7.0, 9.0], [7.0, 9.0]]), 0.9)
                    .with_id("p"),
                Region::new("line", Polygon::from(vec![[5.0, 2.0], [5.0, 12.0], [5.0, 7.0]]), 0.9)
                    .with_id("l"),
            ],
        )
        .with_dimensions(dims);
        let scene = render(&session, &RevealCache::new(), |_| RevealState::Redacted);
        assert_eq!(scene.overlays.len(), 2);
        let base = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255]));

        let out = compose(&base, &scene);

        assert!(outline_pixels(&out, 6..=9, 8..=11) > 0);
        assert!(outline_pixels(&out, 4..=7, 1..=13) > 0);
        assert_eq!(out.get_pixel(15, 15), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_outline_rect_minimum_size_stays_inside_image() {
        let dims = ImageDimensions::new(20, 20).unwrap();
        let corner = PixelRect { x: 20, y: 20, width: 0, height: 0 };
        assert_eq!(
            outline_rect(corner, 2, dims),
            PixelRect { x: 18, y: 18, width: 2, height: 2 }
        );

        let line = PixelRect { x: 5, y: 2, width: 0, height: 10 };
        assert_eq!(
            outline_rect(line, 2, dims),
            PixelRect { x: 5, y: 2, width: 2, height: 10 }
        );

        let tiny = ImageDimensions::new(1, 1).unwrap();
        assert_eq!(
            outline_rect(PixelRect::default(), 2, tiny),
            PixelRect { x: 0, y: 0, width: 1, height: 1 }
        );
    }
}
