//! Device transport contract.
//!
//! A remote device exposes one [`TransferManager`] per sub-resource. Requests
//! are fire-and-forget; each one is answered by exactly one [`TransferEvent`]
//! delivered through the [`Subscription`] the orchestrator registered with the
//! device. Every subscription carries the identity epoch it was created for,
//! and every event it delivers is stamped with that epoch.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::resource::ResourceKind;

use super::types::{DeviceId, DeviceIdentity, DeviceProfile};

/// Shared handle to a device.
pub type DeviceHandle = Arc<dyn RemoteDevice>;

/// Transfer of a single dataset to or from a device.
#[cfg_attr(test, mockall::automock)]
pub trait TransferManager: Send + Sync {
    /// Requests the device's copy of the dataset.
    fn request_load(&self);

    /// Requests that the device replace its copy with `payload`.
    fn request_store(&self, payload: Value);

    /// Requests that the device clear its copy.
    fn request_remove_all(&self);

    /// Returns true while a request is outstanding on the device side.
    fn in_progress(&self) -> bool;

    /// The device copy as of the last completed transfer.
    fn cached(&self) -> Value;
}

/// A remote device, or the local stand-in used while offline.
pub trait RemoteDevice: Send + Sync {
    /// System id, or `None` for the local stand-in.
    fn id(&self) -> Option<DeviceId>;

    /// Firmware and vehicle class.
    fn profile(&self) -> DeviceProfile;

    /// Transfer manager for one sub-resource, `None` without a transport.
    fn transfer(&self, kind: ResourceKind) -> Option<Arc<dyn TransferManager>>;

    /// Routes all further completions to `subscription`.
    fn subscribe(&self, subscription: Subscription);

    /// Stops delivering completions.
    fn unsubscribe(&self);

    /// Returns true once the device's own initial plan download has finished.
    fn initial_plan_request_complete(&self) -> bool;

    /// Marks the initial plan download as finished.
    fn force_initial_plan_request_complete(&self);

    /// Identity this device stands for.
    fn identity(&self) -> DeviceIdentity {
        self.id().map_or(DeviceIdentity::None, DeviceIdentity::Connected)
    }
}

/// Kind of transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferOp {
    /// Device to local.
    Load,
    /// Local to device.
    Store,
    /// Clear the device copy.
    RemoveAll,
}

/// Result of a transfer request.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    /// The request succeeded; loads carry the device copy, other requests `Null`.
    Success(Value),
    /// The request failed on the device side.
    Failure(String),
}

/// Completion notification from a transfer manager.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferEvent {
    /// Identity epoch of the subscription that delivered the event.
    pub epoch: u64,
    /// Sub-resource that completed.
    pub kind: ResourceKind,
    /// Request that completed.
    pub op: TransferOp,
    /// Outcome of the request.
    pub outcome: TransferOutcome,
}

/// Registration of the orchestrator's completion channel with a device.
#[derive(Debug, Clone)]
pub struct Subscription {
    epoch: u64,
    sink: mpsc::UnboundedSender<TransferEvent>,
}

/// The manager identity as seen by the sub-resource controllers.
#[derive(Clone)]
pub struct ManagerBinding {
    /// Device authoritative for remote operations.
    pub device: DeviceHandle,
    /// Identity epoch this binding belongs to.
    pub epoch: u64,
    /// True when `device` is the local stand-in.
    pub offline: bool,
}

impl Subscription {
    /// Creates a subscription for the given epoch.
    #[must_use]
    pub const fn new(epoch: u64, sink: mpsc::UnboundedSender<TransferEvent>) -> Self {
        Self { epoch, sink }
    }

    /// Epoch stamped on delivered events.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Delivers a completion.
    pub fn notify(&self, kind: ResourceKind, op: TransferOp, outcome: TransferOutcome) {
        let event = TransferEvent {
            epoch: self.epoch,
            kind,
            op,
            outcome,
        };
        if self.sink.send(event).is_err() {
            debug!("Completion for {kind} dropped: orchestrator is gone");
        }
    }
}

impl ManagerBinding {
    /// Transfer manager of the bound device for `kind`.
    #[must_use]
    pub fn transfer(&self, kind: ResourceKind) -> Option<Arc<dyn TransferManager>> {
        if self.offline {
            return None;
        }
        self.device.transfer(kind)
    }
}

impl std::fmt::Debug for ManagerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerBinding")
            .field("identity", &self.device.identity())
            .field("epoch", &self.epoch)
            .field("offline", &self.offline)
            .finish()
    }
}

impl std::fmt::Display for TransferOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            Self::Load => "load",
            Self::Store => "store",
            Self::RemoveAll => "remove-all",
        };
        write!(f, "{op}")
    }
}
