//! Region validation: structural checks on backend-supplied regions.
//!
//! The backend is an external collaborator, so its output is checked before a
//! session is built from it. Malformed regions are reported individually so
//! the caller can drop them without rejecting the whole upload.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::region::{Region, MIN_POLYGON_POINTS};

/// Validate a single region's structure.
///
/// This performs:
/// - Vertex count check
/// - Finite coordinate check
/// - Confidence range check
/// - Non-empty id check (when an id is present)
pub fn validate_region(region: &Region) -> Result<(), ValidationError> {
    // 1. Enough vertices to enclose an area
    let points = region.polygon.points();
    if points.len() < MIN_POLYGON_POINTS {
        return Err(ValidationError::TooFewPoints(points.len()));
    }

    // 2. Every coordinate is a real number
    if let Some(index) = points.iter().position(|p| !p.is_finite()) {
        return Err(ValidationError::NonFiniteVertex { index });
    }

    // 3. Confidence is a probability
    if !(0.0..=1.0).contains(&region.confidence) {
        return Err(ValidationError::ConfidenceOutOfRange(region.confidence));
    }

    // 4. Present ids are usable as keys
    if let Some(id) = &region.id {
        if id.as_str().is_empty() {
            return Err(ValidationError::EmptyId);
        }
    }

    Ok(())
}

/// Regions that survived validation, plus the ones that were rejected.
#[derive(Debug, Default)]
pub struct SanitizedRegions {
    pub accepted: Vec<Region>,
    pub rejected: Vec<(usize, ValidationError)>,
}

/// Validate a whole region list.
///
/// Invalid regions are moved to `rejected` with their original index. A
/// region whose id repeats an earlier accepted id is rejected too, keeping
/// ids unique within the session.
pub fn sanitize_regions(regions: Vec<Region>) -> SanitizedRegions {
    let mut out = SanitizedRegions::default();
    let mut seen = HashSet::new();

    for (index, region) in regions.into_iter().enumerate() {
        if let Err(e) = validate_region(&region) {
            out.rejected.push((index, e));
            continue;
        }
        if let Some(id) = &region.id {
            if !seen.insert(id.clone()) {
                out.rejected
                    .push((index, ValidationError::DuplicateId(id.to_string())));
                continue;
            }
        }
        out.accepted.push(region);
    }

    out
}
