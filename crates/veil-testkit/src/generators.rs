//! Proptest generators for property-based testing.

use proptest::prelude::*;

use veil_core::{ImageDimensions, Point, Polygon, Region, RegionId};

/// Generate image dimensions up to 4096 on each side.
pub fn dimensions() -> impl Strategy<Value = ImageDimensions> {
    (1u32..=4096, 1u32..=4096)
        .prop_map(|(w, h)| ImageDimensions::new(w, h).expect("sides are non-zero"))
}

/// Generate a polygon with 3-12 vertices lying inside a `width` x `height` image.
pub fn polygon_within(width: u32, height: u32) -> impl Strategy<Value = Polygon> {
    let (w, h) = (f64::from(width), f64::from(height));
    prop::collection::vec((0.0..=w, 0.0..=h), 3..=12).prop_map(|points| {
        Polygon::from_points(points.into_iter().map(|(x, y)| Point::new(x, y)).collect())
    })
}

/// Generate dimensions together with a polygon inside them.
pub fn sized_polygon() -> impl Strategy<Value = (ImageDimensions, Polygon)> {
    dimensions().prop_flat_map(|dims| (Just(dims), polygon_within(dims.width(), dims.height())))
}

/// Generate a region category label.
pub fn category() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("face".to_string()),
        Just("email".to_string()),
        Just("phone".to_string()),
        "[a-z]{1,12}".prop_map(String::from),
    ]
}

/// Generate a region id.
pub fn region_id() -> impl Strategy<Value = RegionId> {
    "[a-z0-9]{1,16}".prop_map(RegionId::new)
}

/// Generate a well-formed region inside a `width` x `height` image, with or
/// without an id.
pub fn region_within(width: u32, height: u32) -> impl Strategy<Value = Region> {
    (
        category(),
        polygon_within(width, height),
        0.0f64..=1.0,
        proptest::option::of(region_id()),
    )
        .prop_map(|(kind, polygon, confidence, id)| {
            let region = Region::new(kind, polygon, confidence);
            match id {
                Some(id) => region.with_id(id),
                None => region,
            }
        })
}

/// Generate up to `max` well-formed regions with distinct ids inside a
/// `width` x `height` image.
pub fn regions_within(width: u32, height: u32, max: usize) -> impl Strategy<Value = Vec<Region>> {
    prop::collection::vec(region_within(width, height), 0..=max).prop_map(|regions| {
        regions
            .into_iter()
            .enumerate()
            .map(|(i, mut region)| {
                if let Some(id) = region.id.take() {
                    region.id = Some(RegionId::new(format!("{i}-{id}")));
                }
                region
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::{sanitize_regions, to_overlay_box, validate_region};

    proptest! {
        #[test]
        fn test_generated_regions_are_valid(region in region_within(640, 480)) {
            prop_assert!(validate_region(&region).is_ok());
        }

        #[test]
        fn test_generated_region_lists_survive_sanitizing(regions in regions_within(64, 64, 8)) {
            let count = regions.len();
            let sanitized = sanitize_regions(regions);

            prop_assert_eq!(sanitized.accepted.len(), count);
            prop_assert!(sanitized.rejected.is_empty());
        }

        #[test]
        fn test_polygon_inside_image_maps_inside_unit_square((dims, polygon) in sized_polygon()) {
            let b = to_overlay_box(&polygon, dims);

            prop_assert!(b.left >= 0.0 && b.top >= 0.0);
            prop_assert!(b.left + b.width <= 1.0 + 1e-9);
            prop_assert!(b.top + b.height <= 1.0 + 1e-9);
        }
    }
}
