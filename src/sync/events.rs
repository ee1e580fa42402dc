//! Orchestrator notifications.

use serde::Serialize;
use uuid::Uuid;

use crate::resource::ResourceKind;

use super::cascade::CascadeDirection;

/// Capacity of the notification channel.
pub const NOTIFICATION_CAPACITY: usize = 256;

/// Aggregate flags over the three sub-resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    /// Any sub-resource differs from its last loaded or stored snapshot.
    pub dirty: bool,
    /// Any sub-resource holds something.
    pub contains_items: bool,
    /// A cascade is running or any sub-resource has a transfer outstanding.
    pub sync_in_progress: bool,
}

/// A notification published by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncNotification {
    /// Aggregate dirty flag changed.
    DirtyChanged {
        /// New value.
        dirty: bool,
    },
    /// Aggregate contains-items flag changed.
    ContainsItemsChanged {
        /// New value.
        contains_items: bool,
    },
    /// Aggregate sync-in-progress flag changed.
    SyncInProgressChanged {
        /// New value.
        sync_in_progress: bool,
    },
    /// The manager identity switched between the stand-in and a device.
    OfflineChanged {
        /// New value.
        offline: bool,
    },
    /// A cascade completed every stage.
    SyncFinished {
        /// Cascade id.
        cascade: Uuid,
        /// Load or store.
        direction: CascadeDirection,
    },
    /// A cascade stopped because a stage failed.
    SyncFailed {
        /// Cascade id.
        cascade: Uuid,
        /// Load or store.
        direction: CascadeDirection,
        /// Stage that failed.
        kind: ResourceKind,
        /// Reason given by the device.
        reason: String,
    },
}

impl SyncStatus {
    /// Notifications describing the change from `previous` to `self`.
    #[must_use]
    pub fn changes_since(&self, previous: &Self) -> Vec<SyncNotification> {
        let mut changes = Vec::new();
        if self.dirty != previous.dirty {
            changes.push(SyncNotification::DirtyChanged { dirty: self.dirty });
        }
        if self.contains_items != previous.contains_items {
            changes.push(SyncNotification::ContainsItemsChanged {
                contains_items: self.contains_items,
            });
        }
        if self.sync_in_progress != previous.sync_in_progress {
            changes.push(SyncNotification::SyncInProgressChanged {
                sync_in_progress: self.sync_in_progress,
            });
        }
        changes
    }
}
