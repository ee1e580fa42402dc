//! Sub-resource identifiers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::section::{BoundarySection, PlanSection, RallySection, RouteSection};

/// The three datasets that make up a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// The route (mission items).
    Route,
    /// The boundary (geofence).
    Boundary,
    /// The rally points.
    RallyPoints,
}

/// Fixed order in which cascades visit the sub-resources.
pub const CASCADE_ORDER: [ResourceKind; 3] = [
    ResourceKind::Route,
    ResourceKind::Boundary,
    ResourceKind::RallyPoints,
];

impl ResourceKind {
    /// Position of this sub-resource in [`CASCADE_ORDER`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Route => 0,
            Self::Boundary => 1,
            Self::RallyPoints => 2,
        }
    }

    /// Key of this sub-resource's section in a plan document.
    #[must_use]
    pub const fn document_key(self) -> &'static str {
        match self {
            Self::Route => "mission",
            Self::Boundary => "geoFence",
            Self::RallyPoints => "rallyPoints",
        }
    }

    /// Serialized form of an empty section of this kind.
    #[must_use]
    pub fn empty_section(self) -> Value {
        match self {
            Self::Route => RouteSection::default().to_value(),
            Self::Boundary => BoundarySection::default().to_value(),
            Self::RallyPoints => RallySection::default().to_value(),
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Route => "route",
            Self::Boundary => "boundary",
            Self::RallyPoints => "rally points",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascade_order_matches_index() {
        for (i, kind) in CASCADE_ORDER.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_empty_sections_carry_version() {
        for kind in CASCADE_ORDER {
            let section = kind.empty_section();
            assert!(section.get("version").is_some(), "{kind} has no version");
        }
    }
}
