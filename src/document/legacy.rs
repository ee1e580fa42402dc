//! Legacy route-only formats, accepted on load only.
//!
//! - Mission JSON: `{"fileType": "Mission", "version": 2, "items": [...], ...}`
//! - Waypoint text: a `QGC WPL 110` header followed by one tab-separated line
//!   per item; the first item is the planned home position.

use serde::Deserialize;
use serde_json::Value;

use crate::error::DocumentError;
use crate::resource::{MissionItem, PlanSection, ROUTE_SECTION_VERSION, RouteSection, SIMPLE_ITEM_TYPE};

use super::parser::{as_object, parse_json, validate_header};

/// File type tag of a legacy mission file.
pub const MISSION_FILE_TYPE: &str = "Mission";

/// Extension of legacy mission files.
pub const MISSION_FILE_EXTENSION: &str = "mission";

/// Extension of waypoint text files.
pub const WAYPOINTS_FILE_EXTENSION: &str = "waypoints";

/// Header of waypoint text files.
pub const WAYPOINTS_HEADER: &str = "QGC WPL 110";

pub(super) const WAYPOINTS_HEADER_PREFIX: &str = "QGC WPL";

const MISSION_MIN_VERSION: i64 = 2;
const MISSION_MAX_VERSION: i64 = 2;

const WAYPOINT_FIELDS: usize = 12;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyMission {
    #[serde(default)]
    firmware_type: u8,
    #[serde(default)]
    vehicle_type: u8,
    #[serde(default)]
    cruise_speed: Option<f64>,
    #[serde(default)]
    hover_speed: Option<f64>,
    #[serde(default)]
    planned_home_position: Option<[f64; 3]>,
    #[serde(default)]
    items: Vec<MissionItem>,
}

/// Parses a legacy mission JSON file into a serialized route section.
///
/// # Errors
///
/// Returns an error if the header or any item is invalid.
pub fn parse_mission(bytes: &[u8]) -> Result<Value, DocumentError> {
    let value = parse_json(bytes)?;
    validate_header(
        as_object(&value)?,
        MISSION_FILE_TYPE,
        MISSION_MIN_VERSION,
        MISSION_MAX_VERSION,
    )?;

    let legacy: LegacyMission = serde_json::from_value(value)
        .map_err(|e| DocumentError::invalid_section("mission", e.to_string()))?;

    let route = RouteSection {
        version: ROUTE_SECTION_VERSION,
        firmware_type: legacy.firmware_type,
        vehicle_type: legacy.vehicle_type,
        cruise_speed: legacy.cruise_speed,
        hover_speed: legacy.hover_speed,
        planned_home_position: legacy.planned_home_position,
        items: legacy.items,
    };
    route
        .validate()
        .map_err(|message| DocumentError::invalid_section("mission", message))?;
    Ok(route.to_value())
}

/// Parses a waypoint text file into a serialized route section.
///
/// # Errors
///
/// Returns an error naming the first malformed line.
pub fn parse_waypoints(text: &str) -> Result<Value, DocumentError> {
    let mut lines = text.lines().enumerate();

    let header = lines.next().map(|(_, l)| l.trim()).unwrap_or_default();
    if !header.starts_with(WAYPOINTS_HEADER) {
        return Err(DocumentError::InvalidWaypointLine {
            line: 1,
            message: format!("expected header '{WAYPOINTS_HEADER}'"),
        });
    }

    let mut route = RouteSection::default();
    for (index, line) in lines {
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let waypoint = parse_waypoint_line(line).map_err(|message| {
            DocumentError::InvalidWaypointLine {
                line: line_number,
                message,
            }
        })?;

        if waypoint.sequence == 0 && route.planned_home_position.is_none() && route.items.is_empty()
        {
            let home = [waypoint.lat, waypoint.lon, waypoint.alt];
            if home.iter().any(|v| !v.is_finite()) {
                return Err(DocumentError::InvalidWaypointLine {
                    line: line_number,
                    message: String::from("home position is not finite"),
                });
            }
            route.planned_home_position = Some(home);
            continue;
        }

        route.items.push(MissionItem {
            item_type: SIMPLE_ITEM_TYPE.to_string(),
            command: waypoint.command,
            frame: waypoint.frame,
            params: waypoint.params,
            auto_continue: waypoint.auto_continue,
            do_jump_id: waypoint.sequence,
        });
    }

    route
        .validate()
        .map_err(|message| DocumentError::invalid_section("mission", message))?;
    Ok(route.to_value())
}

struct Waypoint {
    sequence: u32,
    frame: u8,
    command: u16,
    params: [Option<f64>; 7],
    lat: f64,
    lon: f64,
    alt: f64,
    auto_continue: bool,
}

fn parse_waypoint_line(line: &str) -> Result<Waypoint, String> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    if fields.len() != WAYPOINT_FIELDS {
        return Err(format!(
            "expected {WAYPOINT_FIELDS} tab-separated fields, found {}",
            fields.len()
        ));
    }

    let sequence = parse_field::<u32>(fields[0], "index")?;
    let frame = parse_field::<u8>(fields[2], "frame")?;
    let command = parse_field::<u16>(fields[3], "command")?;

    let mut numbers = [0.0_f64; 7];
    for (slot, field) in numbers.iter_mut().zip(&fields[4..11]) {
        *slot = parse_field::<f64>(field, "parameter")?;
        if slot.is_infinite() {
            return Err(format!("parameter '{field}' is not finite"));
        }
    }
    let params = numbers.map(|p| if p.is_nan() { None } else { Some(p) });

    Ok(Waypoint {
        sequence,
        frame,
        command,
        params,
        lat: numbers[4],
        lon: numbers[5],
        alt: numbers[6],
        auto_continue: parse_field::<u8>(fields[11], "autocontinue")? != 0,
    })
}

fn parse_field<T: std::str::FromStr>(field: &str, name: &str) -> Result<T, String> {
    field
        .parse()
        .map_err(|_| format!("invalid {name} '{field}'"))
}
