//! Plan file storage.
//!
//! This module provides:
//! - The `PlanStore` trait implemented by storage backends
//! - A local file-based backend with atomic writes

mod backend;
mod local;

pub use backend::PlanStore;
pub use local::{DEFAULT_PLAN_DIR, LocalPlanStore, with_plan_extension};
