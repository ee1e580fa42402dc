//! Plan document parsing.
//!
//! Parsing checks the whole document before handing anything to a
//! controller: a document that fails any check is rejected wholesale.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::DocumentError;
use crate::resource::CASCADE_ORDER;

use super::legacy;
use super::types::{
    MAX_SUPPORTED_VERSION, MIN_SUPPORTED_VERSION, PLAN_FILE_EXTENSION, PLAN_FILE_TYPE,
    PlanDocument,
};

/// On-disk formats accepted on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Composite plan file.
    Plan,
    /// Legacy route-only JSON file.
    Mission,
    /// Legacy route-only waypoint text file.
    Waypoints,
}

/// Result of parsing a file in any accepted format.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedDocument {
    /// A full plan.
    Plan(PlanDocument),
    /// A serialized route from a legacy format; boundary and rally points are empty.
    RouteOnly(Value),
}

impl DocumentFormat {
    /// Picks a format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is not recognised.
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some(PLAN_FILE_EXTENSION) => Ok(Self::Plan),
            Some(legacy::MISSION_FILE_EXTENSION) => Ok(Self::Mission),
            Some(legacy::WAYPOINTS_FILE_EXTENSION | "txt") => Ok(Self::Waypoints),
            _ => Err(DocumentError::UnknownFormat { hint: extension }),
        }
    }

    /// Picks a format from file content.
    ///
    /// # Errors
    ///
    /// Returns an error if the content matches no accepted format.
    pub fn sniff(bytes: &[u8]) -> Result<Self, DocumentError> {
        let text = String::from_utf8_lossy(bytes);
        let trimmed = text.trim_start();
        if trimmed.starts_with(legacy::WAYPOINTS_HEADER_PREFIX) {
            return Ok(Self::Waypoints);
        }

        let file_type = serde_json::from_str::<Value>(trimmed)
            .ok()
            .and_then(|v| v.get("fileType").and_then(Value::as_str).map(String::from));
        match file_type.as_deref() {
            Some(PLAN_FILE_TYPE) => Ok(Self::Plan),
            Some(legacy::MISSION_FILE_TYPE) => Ok(Self::Mission),
            other => Err(DocumentError::UnknownFormat {
                hint: other.map(String::from),
            }),
        }
    }

    /// Extension used for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Plan => PLAN_FILE_EXTENSION,
            Self::Mission => legacy::MISSION_FILE_EXTENSION,
            Self::Waypoints => legacy::WAYPOINTS_FILE_EXTENSION,
        }
    }

    /// Returns true for the route-only formats.
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        !matches!(self, Self::Plan)
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Plan => "plan",
            Self::Mission => "mission (legacy)",
            Self::Waypoints => "waypoints (legacy)",
        };
        write!(f, "{name}")
    }
}

impl LoadedDocument {
    /// Converts into a full plan, filling in empty sections for legacy formats.
    #[must_use]
    pub fn into_plan(self, ground_station: &str) -> PlanDocument {
        match self {
            Self::Plan(document) => document,
            Self::RouteOnly(route) => PlanDocument::from_route(ground_station, route),
        }
    }
}

/// Parses bytes in the given format.
///
/// # Errors
///
/// Returns an error if the content is malformed for that format.
pub fn parse(bytes: &[u8], format: DocumentFormat) -> Result<LoadedDocument, DocumentError> {
    match format {
        DocumentFormat::Plan => parse_plan(bytes).map(LoadedDocument::Plan),
        DocumentFormat::Mission => legacy::parse_mission(bytes).map(LoadedDocument::RouteOnly),
        DocumentFormat::Waypoints => {
            let text = std::str::from_utf8(bytes).map_err(|e| DocumentError::InvalidJson {
                message: format!("waypoint file is not UTF-8: {e}"),
            })?;
            legacy::parse_waypoints(text).map(LoadedDocument::RouteOnly)
        }
    }
}

/// Parses a plan document, checking the header and that every section is present.
///
/// Section contents are checked by the controllers that own them.
///
/// # Errors
///
/// Returns an error on invalid JSON, a wrong file type, an unsupported
/// version, or a missing or non-object section.
pub fn parse_plan(bytes: &[u8]) -> Result<PlanDocument, DocumentError> {
    let value = parse_json(bytes)?;
    let object = as_object(&value)?;
    validate_header(object, PLAN_FILE_TYPE, MIN_SUPPORTED_VERSION, MAX_SUPPORTED_VERSION)?;

    for kind in CASCADE_ORDER {
        let key = kind.document_key();
        match object.get(key) {
            None => return Err(DocumentError::missing_key(key)),
            Some(section) if !section.is_object() => {
                return Err(DocumentError::invalid_section(key, "expected an object"));
            }
            Some(_) => {}
        }
    }

    let document: PlanDocument =
        serde_json::from_value(value).map_err(|e| DocumentError::InvalidJson {
            message: e.to_string(),
        })?;
    debug!(
        "Parsed plan v{} written by '{}'",
        document.version, document.ground_station
    );
    Ok(document)
}

pub(super) fn parse_json(bytes: &[u8]) -> Result<Value, DocumentError> {
    serde_json::from_slice(bytes).map_err(|e| DocumentError::InvalidJson {
        message: e.to_string(),
    })
}

pub(super) fn as_object(value: &Value) -> Result<&Map<String, Value>, DocumentError> {
    value.as_object().ok_or_else(|| DocumentError::InvalidJson {
        message: String::from("top-level value is not an object"),
    })
}

/// Checks the `fileType` tag and that `version` lies within `min..=max`.
pub(super) fn validate_header(
    object: &Map<String, Value>,
    expected_type: &str,
    min: i64,
    max: i64,
) -> Result<i64, DocumentError> {
    let found = object
        .get("fileType")
        .ok_or_else(|| DocumentError::missing_key("fileType"))?
        .as_str()
        .unwrap_or_default();
    if found != expected_type {
        return Err(DocumentError::WrongFileType {
            expected: expected_type.to_string(),
            found: found.to_string(),
        });
    }

    let version = object
        .get("version")
        .ok_or_else(|| DocumentError::missing_key("version"))?
        .as_i64()
        .ok_or_else(|| DocumentError::invalid_section("version", "expected an integer"))?;
    if !(min..=max).contains(&version) {
        return Err(DocumentError::UnsupportedVersion {
            found: version,
            min,
            max,
        });
    }

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan_bytes(version: i64) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "fileType": "Plan",
            "version": version,
            "groundStation": "plansync",
            "mission": { "version": 2, "items": [] },
            "geoFence": { "version": 2, "polygons": [], "circles": [] },
            "rallyPoints": { "version": 2, "points": [] }
        }))
        .expect("serializes")
    }

    #[test]
    fn test_parse_plan() {
        let document = parse_plan(&plan_bytes(1)).expect("valid plan");
        assert_eq!(document.version, 1);
        assert_eq!(document.ground_station, "plansync");
    }

    #[test]
    fn test_version_outside_range() {
        for version in [0, 2] {
            let err = parse_plan(&plan_bytes(version)).expect_err("rejected");
            assert_eq!(
                err,
                DocumentError::UnsupportedVersion {
                    found: version,
                    min: 1,
                    max: 1
                }
            );
        }
    }

    #[test]
    fn test_wrong_file_type() {
        let bytes = br#"{"fileType":"Mission","version":1}"#;
        assert!(matches!(
            parse_plan(bytes),
            Err(DocumentError::WrongFileType { .. })
        ));
    }

    #[test]
    fn test_missing_section() {
        let bytes = serde_json::to_vec(&json!({
            "fileType": "Plan",
            "version": 1,
            "mission": { "version": 2, "items": [] },
            "geoFence": { "version": 2 }
        }))
        .expect("serializes");
        assert_eq!(
            parse_plan(&bytes),
            Err(DocumentError::missing_key("rallyPoints"))
        );
    }

    #[test]
    fn test_section_must_be_object() {
        let bytes = serde_json::to_vec(&json!({
            "fileType": "Plan",
            "version": 1,
            "mission": [],
            "geoFence": {},
            "rallyPoints": {}
        }))
        .expect("serializes");
        assert!(matches!(
            parse_plan(&bytes),
            Err(DocumentError::InvalidSection { ref section, .. }) if section == "mission"
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            parse_plan(b"{ not json"),
            Err(DocumentError::InvalidJson { .. })
        ));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("a/b.plan")),
            Ok(DocumentFormat::Plan)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("old.MISSION")),
            Ok(DocumentFormat::Mission)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("wp.txt")),
            Ok(DocumentFormat::Waypoints)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("area.kml")),
            Err(DocumentError::UnknownFormat {
                hint: Some(String::from("kml"))
            })
        );
    }

    #[test]
    fn test_sniff() {
        assert_eq!(DocumentFormat::sniff(&plan_bytes(1)), Ok(DocumentFormat::Plan));
        assert_eq!(
            DocumentFormat::sniff(b"QGC WPL 110\n"),
            Ok(DocumentFormat::Waypoints)
        );
        assert!(DocumentFormat::sniff(b"hello").is_err());
    }
}
