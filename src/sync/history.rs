//! Bounded record of past cascades.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::device::DeviceIdentity;
use crate::resource::ResourceKind;

use super::cascade::{Cascade, CascadeDirection};

/// Number of entries kept.
pub const MAX_HISTORY_ENTRIES: usize = 100;

/// How a cascade ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Every stage completed.
    Finished,
    /// A stage failed.
    Failed {
        /// Stage that failed.
        kind: ResourceKind,
        /// Reason given by the device.
        reason: String,
    },
    /// The manager identity changed before the cascade completed.
    Abandoned,
}

/// A single entry in the sync history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncHistoryEntry {
    /// Cascade id.
    pub cascade: Uuid,
    /// Load or store.
    pub direction: CascadeDirection,
    /// Device the cascade ran against.
    pub device: DeviceIdentity,
    /// When the cascade started.
    pub started_at: DateTime<Utc>,
    /// When the cascade ended.
    pub finished_at: DateTime<Utc>,
    /// How it ended.
    #[serde(flatten)]
    pub outcome: SyncOutcome,
}

/// The last [`MAX_HISTORY_ENTRIES`] cascades, oldest first.
#[derive(Debug, Clone, Default)]
pub struct SyncHistory {
    entries: VecDeque<SyncHistoryEntry>,
}

impl SyncHistoryEntry {
    /// Creates an entry for a cascade that ends now.
    #[must_use]
    pub fn ended(cascade: &Cascade, device: DeviceIdentity, outcome: SyncOutcome) -> Self {
        Self {
            cascade: cascade.id,
            direction: cascade.direction,
            device,
            started_at: cascade.started_at,
            finished_at: Utc::now(),
            outcome,
        }
    }

    /// Returns true if the cascade completed.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Finished)
    }
}

impl SyncHistory {
    /// Adds an entry, dropping the oldest one when full.
    pub fn push(&mut self, entry: SyncHistoryEntry) {
        if self.entries.len() >= MAX_HISTORY_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &SyncHistoryEntry> {
        self.entries.iter()
    }

    /// Most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<&SyncHistoryEntry> {
        self.entries.back()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded() {
        let mut history = SyncHistory::default();
        let first = Cascade::begin(CascadeDirection::Load, 0);
        history.push(SyncHistoryEntry::ended(
            &first,
            DeviceIdentity::None,
            SyncOutcome::Abandoned,
        ));

        for _ in 0..MAX_HISTORY_ENTRIES {
            let cascade = Cascade::begin(CascadeDirection::Store, 1);
            history.push(SyncHistoryEntry::ended(
                &cascade,
                DeviceIdentity::None,
                SyncOutcome::Finished,
            ));
        }

        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        assert!(history.entries().all(|e| e.cascade != first.id));
        assert!(history.last().is_some_and(SyncHistoryEntry::succeeded));
    }
}
