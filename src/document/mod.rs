//! Plan documents.
//!
//! This module provides:
//! - The composite `PlanDocument` and its format constants
//! - Atomic parsing and header validation
//! - The two legacy route-only formats

mod legacy;
mod parser;
mod types;

pub use legacy::{
    MISSION_FILE_EXTENSION, MISSION_FILE_TYPE, WAYPOINTS_FILE_EXTENSION, WAYPOINTS_HEADER,
    parse_mission, parse_waypoints,
};
pub use parser::{DocumentFormat, LoadedDocument, parse, parse_plan};
pub use types::{
    MAX_SUPPORTED_VERSION, MIN_SUPPORTED_VERSION, PLAN_FILE_EXTENSION, PLAN_FILE_TYPE,
    PLAN_FILE_VERSION, PlanContents, PlanDocument,
};
