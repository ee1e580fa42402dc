//! Plan synchronization.
//!
//! This module provides:
//! - `SyncOrchestrator`, which runs load and store cascades and reconciles
//!   state when the manager identity changes
//! - The cascade state machine
//! - Notifications and the bounded sync history

mod cascade;
mod events;
mod history;
mod orchestrator;

pub use cascade::{Cascade, CascadeDirection, CascadeStage};
pub use events::{NOTIFICATION_CAPACITY, SyncNotification, SyncStatus};
pub use history::{MAX_HISTORY_ENTRIES, SyncHistory, SyncHistoryEntry, SyncOutcome};
pub use orchestrator::SyncOrchestrator;
