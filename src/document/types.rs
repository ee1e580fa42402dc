//! The composite plan document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DocumentError;
use crate::resource::{
    BoundarySection, CASCADE_ORDER, PlanSection, RallySection, ResourceKind, RouteSection,
};

/// File type tag of a plan document.
pub const PLAN_FILE_TYPE: &str = "Plan";

/// Version written by this crate.
pub const PLAN_FILE_VERSION: i64 = 1;

/// Lowest plan file version accepted on load.
pub const MIN_SUPPORTED_VERSION: i64 = 1;

/// Highest plan file version accepted on load.
pub const MAX_SUPPORTED_VERSION: i64 = 1;

/// Extension of plan files.
pub const PLAN_FILE_EXTENSION: &str = "plan";

/// A plan: the route, boundary and rally points under one versioned header.
///
/// All three sections are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDocument {
    /// Always [`PLAN_FILE_TYPE`].
    pub file_type: String,
    /// Format version.
    pub version: i64,
    /// Name of the application that wrote the file.
    #[serde(default)]
    pub ground_station: String,
    /// The route section.
    pub mission: Value,
    /// The boundary section.
    pub geo_fence: Value,
    /// The rally point section.
    pub rally_points: Value,
}

/// Typed view of the three sections of a plan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanContents {
    /// The route.
    pub route: RouteSection,
    /// The boundary.
    pub boundary: BoundarySection,
    /// The rally points.
    pub rally: RallySection,
}

impl PlanDocument {
    /// Builds a document with the current header from three serialized sections.
    #[must_use]
    pub fn new(
        ground_station: impl Into<String>,
        mission: Value,
        geo_fence: Value,
        rally_points: Value,
    ) -> Self {
        Self {
            file_type: PLAN_FILE_TYPE.to_string(),
            version: PLAN_FILE_VERSION,
            ground_station: ground_station.into(),
            mission,
            geo_fence,
            rally_points,
        }
    }

    /// Builds a document holding only a route.
    #[must_use]
    pub fn from_route(ground_station: impl Into<String>, mission: Value) -> Self {
        Self::new(
            ground_station,
            mission,
            ResourceKind::Boundary.empty_section(),
            ResourceKind::RallyPoints.empty_section(),
        )
    }

    /// The serialized section of one sub-resource.
    #[must_use]
    pub const fn section(&self, kind: ResourceKind) -> &Value {
        match kind {
            ResourceKind::Route => &self.mission,
            ResourceKind::Boundary => &self.geo_fence,
            ResourceKind::RallyPoints => &self.rally_points,
        }
    }

    /// The three sections in cascade order.
    pub fn sections(&self) -> impl Iterator<Item = (ResourceKind, &Value)> {
        CASCADE_ORDER.into_iter().map(|kind| (kind, self.section(kind)))
    }

    /// Serializes the document as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let mut bytes = serde_json::to_vec_pretty(self).map_err(|e| DocumentError::InvalidJson {
            message: e.to_string(),
        })?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

impl PlanContents {
    /// Parses and validates all three sections of a document.
    ///
    /// # Errors
    ///
    /// Returns the first section error found.
    pub fn from_document(document: &PlanDocument) -> Result<Self, DocumentError> {
        Ok(Self {
            route: RouteSection::from_value(&document.mission)?,
            boundary: BoundarySection::from_value(&document.geo_fence)?,
            rally: RallySection::from_value(&document.rally_points)?,
        })
    }

    /// Number of entries per sub-resource, in cascade order.
    #[must_use]
    pub fn item_counts(&self) -> [(ResourceKind, usize); 3] {
        [
            (ResourceKind::Route, self.route.item_count()),
            (ResourceKind::Boundary, self.boundary.item_count()),
            (ResourceKind::RallyPoints, self.rally.item_count()),
        ]
    }
}
