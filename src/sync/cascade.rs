//! Cascade state machine.
//!
//! A cascade walks [`CASCADE_ORDER`] one stage at a time. The only thing that
//! advances it is a completion event that matches the awaited stage, the
//! cascade's request kind and the identity epoch it was started under.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::device::{TransferEvent, TransferOp};
use crate::resource::{CASCADE_ORDER, ResourceKind};

/// Direction of a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CascadeDirection {
    /// Device to local.
    Load,
    /// Local to device.
    Store,
}

/// Stage of a cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStage {
    /// No cascade is running.
    #[default]
    Idle,
    /// Waiting for the route transfer.
    AwaitingRoute,
    /// Waiting for the boundary transfer.
    AwaitingBoundary,
    /// Waiting for the rally point transfer.
    AwaitingRally,
}

/// A running cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cascade {
    /// Unique id, used in notifications and history.
    pub id: Uuid,
    /// Load or store.
    pub direction: CascadeDirection,
    /// Current stage.
    pub stage: CascadeStage,
    /// Identity epoch the cascade was started under.
    pub epoch: u64,
    /// When the cascade started.
    pub started_at: DateTime<Utc>,
}

impl CascadeDirection {
    /// Transfer request issued at each stage.
    #[must_use]
    pub const fn op(self) -> TransferOp {
        match self {
            Self::Load => TransferOp::Load,
            Self::Store => TransferOp::Store,
        }
    }
}

impl std::fmt::Display for CascadeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Store => write!(f, "store"),
        }
    }
}

impl CascadeStage {
    /// Stage that waits for `kind`.
    #[must_use]
    pub const fn awaiting(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Route => Self::AwaitingRoute,
            ResourceKind::Boundary => Self::AwaitingBoundary,
            ResourceKind::RallyPoints => Self::AwaitingRally,
        }
    }

    /// Sub-resource this stage waits for.
    #[must_use]
    pub const fn kind(self) -> Option<ResourceKind> {
        match self {
            Self::Idle => None,
            Self::AwaitingRoute => Some(ResourceKind::Route),
            Self::AwaitingBoundary => Some(ResourceKind::Boundary),
            Self::AwaitingRally => Some(ResourceKind::RallyPoints),
        }
    }

    /// Stage that follows this one; the last stage is followed by `Idle`.
    #[must_use]
    pub fn next(self) -> Self {
        self.kind()
            .and_then(|kind| CASCADE_ORDER.get(kind.index() + 1).copied())
            .map_or(Self::Idle, Self::awaiting)
    }
}

impl std::fmt::Display for CascadeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "awaiting {kind}"),
            None => write!(f, "idle"),
        }
    }
}

impl Cascade {
    /// Starts a cascade at its first stage.
    #[must_use]
    pub fn begin(direction: CascadeDirection, epoch: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            direction,
            stage: CascadeStage::awaiting(CASCADE_ORDER[0]),
            epoch,
            started_at: Utc::now(),
        }
    }

    /// Sub-resource the cascade is waiting for.
    #[must_use]
    pub const fn awaited(&self) -> Option<ResourceKind> {
        self.stage.kind()
    }

    /// Returns true if `event` completes the awaited stage.
    #[must_use]
    pub fn accepts(&self, event: &TransferEvent) -> bool {
        event.epoch == self.epoch
            && event.op == self.direction.op()
            && self.awaited() == Some(event.kind)
    }

    /// Moves to the next stage and returns the sub-resource to request next.
    ///
    /// Returns `None` once the last stage has completed.
    pub fn advance(&mut self) -> Option<ResourceKind> {
        self.stage = self.stage.next();
        self.stage.kind()
    }

    /// Returns true once every stage has completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stage == CascadeStage::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::TransferOutcome;
    use serde_json::Value;

    fn event(epoch: u64, kind: ResourceKind, op: TransferOp) -> TransferEvent {
        TransferEvent {
            epoch,
            kind,
            op,
            outcome: TransferOutcome::Success(Value::Null),
        }
    }

    #[test]
    fn test_stage_order() {
        assert_eq!(CascadeStage::AwaitingRoute.next(), CascadeStage::AwaitingBoundary);
        assert_eq!(CascadeStage::AwaitingBoundary.next(), CascadeStage::AwaitingRally);
        assert_eq!(CascadeStage::AwaitingRally.next(), CascadeStage::Idle);
        assert_eq!(CascadeStage::Idle.next(), CascadeStage::Idle);
    }

    #[test]
    fn test_cascade_walks_all_stages() {
        let mut cascade = Cascade::begin(CascadeDirection::Store, 4);
        assert_eq!(cascade.awaited(), Some(ResourceKind::Route));
        assert_eq!(cascade.advance(), Some(ResourceKind::Boundary));
        assert_eq!(cascade.advance(), Some(ResourceKind::RallyPoints));
        assert_eq!(cascade.advance(), None);
        assert!(cascade.is_complete());
    }

    #[test]
    fn test_accepts_only_matching_events() {
        let cascade = Cascade::begin(CascadeDirection::Load, 2);

        assert!(cascade.accepts(&event(2, ResourceKind::Route, TransferOp::Load)));
        assert!(!cascade.accepts(&event(1, ResourceKind::Route, TransferOp::Load)));
        assert!(!cascade.accepts(&event(2, ResourceKind::Boundary, TransferOp::Load)));
        assert!(!cascade.accepts(&event(2, ResourceKind::Route, TransferOp::Store)));
    }
}
