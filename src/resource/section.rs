//! Section data models for the three plan datasets.
//!
//! These types map one-to-one onto the `mission`, `geoFence` and
//! `rallyPoints` objects of a plan file. Each section validates itself so that
//! a document can be checked as a whole before any controller is touched.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DocumentError;

use super::kind::ResourceKind;

/// Current version of the route section format.
pub const ROUTE_SECTION_VERSION: u32 = 2;

/// Current version of the boundary section format.
pub const BOUNDARY_SECTION_VERSION: u32 = 2;

/// Current version of the rally point section format.
pub const RALLY_SECTION_VERSION: u32 = 2;

/// Item type tag for plain mission items.
pub const SIMPLE_ITEM_TYPE: &str = "SimpleItem";

/// Common behaviour of the three section types.
pub trait PlanSection:
    Serialize + DeserializeOwned + Default + Clone + PartialEq + std::fmt::Debug + Send + 'static
{
    /// Sub-resource this section belongs to.
    const KIND: ResourceKind;

    /// Returns true if the section holds nothing worth showing.
    fn is_empty(&self) -> bool;

    /// Number of top-level entries (items, fences, points).
    fn item_count(&self) -> usize;

    /// Checks the section's own invariants.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant.
    fn validate(&self) -> std::result::Result<(), String>;

    /// Parses and validates a serialized section.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not match the section format.
    fn from_value(value: &Value) -> Result<Self, DocumentError> {
        let section: Self = serde_json::from_value(value.clone()).map_err(|e| {
            DocumentError::invalid_section(Self::KIND.document_key(), e.to_string())
        })?;
        section
            .validate()
            .map_err(|message| DocumentError::invalid_section(Self::KIND.document_key(), message))?;
        Ok(section)
    }

    /// Serializes the section.
    fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// The route: an ordered list of mission items plus vehicle defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSection {
    /// Section format version.
    pub version: u32,
    /// Autopilot firmware the route was planned for.
    #[serde(default)]
    pub firmware_type: u8,
    /// Vehicle type the route was planned for.
    #[serde(default)]
    pub vehicle_type: u8,
    /// Default cruise speed in m/s.
    #[serde(default)]
    pub cruise_speed: Option<f64>,
    /// Default hover speed in m/s.
    #[serde(default)]
    pub hover_speed: Option<f64>,
    /// Planned home position as `[lat, lon, alt]`.
    #[serde(default)]
    pub planned_home_position: Option<[f64; 3]>,
    /// Mission items in execution order.
    #[serde(default)]
    pub items: Vec<MissionItem>,
}

/// A single mission item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionItem {
    /// Item type tag.
    #[serde(rename = "type")]
    pub item_type: String,
    /// MAVLink command id.
    pub command: u16,
    /// MAVLink coordinate frame.
    pub frame: u8,
    /// The seven command parameters; `null` stands for "unused".
    pub params: [Option<f64>; 7],
    /// Whether the vehicle continues to the next item automatically.
    #[serde(default = "default_auto_continue")]
    pub auto_continue: bool,
    /// Sequence number used as a jump target.
    #[serde(default)]
    pub do_jump_id: u32,
}

/// The boundary: inclusion/exclusion polygons and circles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundarySection {
    /// Section format version.
    pub version: u32,
    /// Polygonal fences.
    #[serde(default)]
    pub polygons: Vec<FencePolygon>,
    /// Circular fences.
    #[serde(default)]
    pub circles: Vec<FenceCircle>,
    /// Point to return to on breach, as `[lat, lon, alt]`.
    #[serde(default)]
    pub breach_return: Option<[f64; 3]>,
}

/// A polygonal fence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FencePolygon {
    /// True for an inclusion fence, false for an exclusion fence.
    pub inclusion: bool,
    /// Vertices as `[lat, lon]`.
    pub polygon: Vec<[f64; 2]>,
}

/// A circular fence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FenceCircle {
    /// True for an inclusion fence, false for an exclusion fence.
    pub inclusion: bool,
    /// Center as `[lat, lon]`.
    pub center: [f64; 2],
    /// Radius in meters.
    pub radius: f64,
}

/// The rally points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RallySection {
    /// Section format version.
    pub version: u32,
    /// Points as `[lat, lon, alt]`.
    #[serde(default)]
    pub points: Vec<[f64; 3]>,
}

const fn default_auto_continue() -> bool {
    true
}

fn check_version(found: u32, expected: u32) -> std::result::Result<(), String> {
    if found == expected {
        Ok(())
    } else {
        Err(format!("unsupported version {found}, expected {expected}"))
    }
}

fn check_coordinate(lat: f64, lon: f64, what: &str) -> std::result::Result<(), String> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("{what}: coordinate ({lat}, {lon}) is out of range"));
    }
    Ok(())
}

impl Default for RouteSection {
    fn default() -> Self {
        Self {
            version: ROUTE_SECTION_VERSION,
            firmware_type: 0,
            vehicle_type: 0,
            cruise_speed: None,
            hover_speed: None,
            planned_home_position: None,
            items: Vec::new(),
        }
    }
}

impl PlanSection for RouteSection {
    const KIND: ResourceKind = ResourceKind::Route;

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn validate(&self) -> std::result::Result<(), String> {
        check_version(self.version, ROUTE_SECTION_VERSION)?;

        if let Some([lat, lon, _]) = self.planned_home_position {
            check_coordinate(lat, lon, "plannedHomePosition")?;
        }

        for speed in [self.cruise_speed, self.hover_speed].into_iter().flatten() {
            if speed <= 0.0 {
                return Err(format!("speed {speed} must be positive"));
            }
        }

        for (i, item) in self.items.iter().enumerate() {
            if item.item_type != SIMPLE_ITEM_TYPE {
                return Err(format!("items[{i}]: unsupported item type '{}'", item.item_type));
            }
        }

        Ok(())
    }
}

impl MissionItem {
    /// Creates a positional item (waypoint, takeoff, land) at the given location.
    #[must_use]
    pub fn positional(command: u16, frame: u8, lat: f64, lon: f64, alt: f64) -> Self {
        Self {
            item_type: SIMPLE_ITEM_TYPE.to_string(),
            command,
            frame,
            params: [Some(0.0), Some(0.0), Some(0.0), None, Some(lat), Some(lon), Some(alt)],
            auto_continue: true,
            do_jump_id: 0,
        }
    }

    /// Sets the jump target sequence number.
    #[must_use]
    pub fn with_jump_id(mut self, do_jump_id: u32) -> Self {
        self.do_jump_id = do_jump_id;
        self
    }
}

impl Default for BoundarySection {
    fn default() -> Self {
        Self {
            version: BOUNDARY_SECTION_VERSION,
            polygons: Vec::new(),
            circles: Vec::new(),
            breach_return: None,
        }
    }
}

impl PlanSection for BoundarySection {
    const KIND: ResourceKind = ResourceKind::Boundary;

    fn is_empty(&self) -> bool {
        self.polygons.is_empty() && self.circles.is_empty()
    }

    fn item_count(&self) -> usize {
        self.polygons.len() + self.circles.len()
    }

    fn validate(&self) -> std::result::Result<(), String> {
        check_version(self.version, BOUNDARY_SECTION_VERSION)?;

        for (i, fence) in self.polygons.iter().enumerate() {
            if fence.polygon.len() < 3 {
                return Err(format!(
                    "polygons[{i}]: a polygon needs at least 3 vertices, found {}",
                    fence.polygon.len()
                ));
            }
            for [lat, lon] in &fence.polygon {
                check_coordinate(*lat, *lon, &format!("polygons[{i}]"))?;
            }
        }

        for (i, circle) in self.circles.iter().enumerate() {
            if circle.radius <= 0.0 {
                return Err(format!("circles[{i}]: radius {} must be positive", circle.radius));
            }
            check_coordinate(circle.center[0], circle.center[1], &format!("circles[{i}]"))?;
        }

        if let Some([lat, lon, _]) = self.breach_return {
            check_coordinate(lat, lon, "breachReturn")?;
        }

        Ok(())
    }
}

impl Default for RallySection {
    fn default() -> Self {
        Self {
            version: RALLY_SECTION_VERSION,
            points: Vec::new(),
        }
    }
}

impl PlanSection for RallySection {
    const KIND: ResourceKind = ResourceKind::RallyPoints;

    fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn item_count(&self) -> usize {
        self.points.len()
    }

    fn validate(&self) -> std::result::Result<(), String> {
        check_version(self.version, RALLY_SECTION_VERSION)?;
        for (i, [lat, lon, _]) in self.points.iter().enumerate() {
            check_coordinate(*lat, *lon, &format!("points[{i}]"))?;
        }
        Ok(())
    }
}
