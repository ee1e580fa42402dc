// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden


// ============================================================================
// Crate Documentation
// ============================================================================

//! # Plansync
//!
//! Keeps a vehicle's mission plan (route, boundary and rally points) in step
//! between an editing surface, a plan file and the vehicle itself.
//!
//! ## Overview
//!
//! A plan is three independent datasets that travel together:
//!
//! - The **route**: ordered mission items
//! - The **boundary**: geofence polygons and circles
//! - The **rally points**: safe landing positions
//!
//! ## Architecture
//!
//! The [`sync::SyncOrchestrator`] owns one controller per dataset and runs
//! transfers against the current manager identity:
//!
//! 1. **Cascades**: a load or store visits route, boundary, then rally points,
//!    one stage at a time, and stops at the first failure
//! 2. **Identity reconciliation**: switching between the offline stand-in and a
//!    connected device rebinds every controller and abandons stale work
//! 3. **Plan documents**: the three datasets load and save atomically under one
//!    versioned header
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing and validation
//! - [`device`]: Device identity, transport contract, offline and simulated devices
//! - [`resource`]: Section data models and their controllers
//! - [`document`]: Plan documents and legacy route-only formats
//! - [`sync`]: The orchestrator, cascade state machine and notifications
//! - [`store`]: Plan file storage
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! offline_editing:
//!   firmware: px4
//!   vehicle: multirotor
//! document:
//!   ground_station: plansync
//! storage:
//!   plan_dir: ./plans
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod device;
pub mod document;
pub mod error;
pub mod resource;
pub mod store;
pub mod sync;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, PlanSyncConfig};
pub use device::{DeviceHandle, DeviceIdentity, OfflineDevice, RemoteDevice, SimulatedDevice};
pub use document::{DocumentFormat, PlanDocument};
pub use error::{PlanSyncError, Result};
pub use resource::{ResourceKind, SectionController, SubResourceController};
pub use store::{LocalPlanStore, PlanStore};
pub use sync::{SyncNotification, SyncOrchestrator, SyncStatus};
