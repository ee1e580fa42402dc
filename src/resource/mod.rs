//! The three plan datasets and their controllers.
//!
//! This module provides:
//! - `ResourceKind` and the fixed cascade order
//! - Section data models for the route, boundary and rally points
//! - The `SubResourceController` contract and its in-memory implementation
//! - Section fingerprinting for dirty tracking

mod controller;
mod hash;
mod kind;
mod section;

pub use controller::{SectionController, SubResourceController};
pub use hash::SectionHasher;
pub use kind::{CASCADE_ORDER, ResourceKind};
pub use section::{
    BOUNDARY_SECTION_VERSION, BoundarySection, FenceCircle, FencePolygon, MissionItem,
    PlanSection, RALLY_SECTION_VERSION, ROUTE_SECTION_VERSION, RallySection, RouteSection,
    SIMPLE_ITEM_TYPE,
};
