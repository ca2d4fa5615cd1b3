//! Strong type definitions for the Veil viewer.
//!
//! Server-issued identifiers are opaque strings. They are wrapped in newtypes
//! so an image id can never be passed where a region id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of an ingested image, as issued by the backend.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    /// Wrap a backend-issued identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageId({})", self.0)
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of a region, unique within one image session.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    /// Wrap a backend-issued identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegionId({})", self.0)
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RegionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for RegionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The role the viewer currently asserts.
///
/// This is client-side state only. It decides which request is sent and is
/// never trusted for anything else; the backend makes the actual decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    /// No elevated role.
    #[default]
    Viewer,
    /// Elevated role allowed to decrypt regions.
    Reviewer,
}

impl Role {
    /// Build from the user-facing "Reviewer" toggle.
    pub fn from_reviewer_flag(reviewer: bool) -> Self {
        if reviewer {
            Role::Reviewer
        } else {
            Role::Viewer
        }
    }

    /// Whether the elevated role is asserted.
    pub fn is_reviewer(self) -> bool {
        matches!(self, Role::Reviewer)
    }

    /// Value sent in the role header, if any.
    pub fn header_value(self) -> Option<&'static str> {
        match self {
            Role::Viewer => None,
            Role::Reviewer => Some("Reviewer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_id_display() {
        let id = RegionId::new("r1");
        assert_eq!(format!("{}", id), "r1");
        assert_eq!(format!("{:?}", id), "RegionId(r1)");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = ImageId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        let rid: RegionId = serde_json::from_str("\"r9\"").unwrap();
        assert_eq!(rid.as_str(), "r9");
    }

    #[test]
    fn test_role_header() {
        assert_eq!(Role::from_reviewer_flag(false).header_value(), None);
        assert_eq!(Role::from_reviewer_flag(true).header_value(), Some("Reviewer"));
        assert!(!Role::default().is_reviewer());
    }
}
