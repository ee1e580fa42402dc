//! Local stand-in device used while no remote device is connected.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::resource::ResourceKind;

use super::transport::{RemoteDevice, Subscription, TransferManager};
use super::types::{DeviceId, DeviceProfile};

/// The offline stand-in.
///
/// It has no transport and its initial handshake is always complete. Its
/// profile follows the last connected device so that offline edits target the
/// same firmware and vehicle class.
#[derive(Debug, Default)]
pub struct OfflineDevice {
    profile: Mutex<DeviceProfile>,
}

impl OfflineDevice {
    /// Creates a stand-in with the given editing profile.
    #[must_use]
    pub const fn new(profile: DeviceProfile) -> Self {
        Self {
            profile: Mutex::new(profile),
        }
    }

    /// Replaces the editing profile.
    pub fn set_profile(&self, profile: DeviceProfile) {
        let mut current = self.profile.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != profile {
            debug!("Offline editing profile changed: {} -> {}", *current, profile);
            *current = profile;
        }
    }
}

impl RemoteDevice for OfflineDevice {
    fn id(&self) -> Option<DeviceId> {
        None
    }

    fn profile(&self) -> DeviceProfile {
        *self.profile.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transfer(&self, _kind: ResourceKind) -> Option<Arc<dyn TransferManager>> {
        None
    }

    fn subscribe(&self, _subscription: Subscription) {}

    fn unsubscribe(&self) {}

    fn initial_plan_request_complete(&self) -> bool {
        true
    }

    fn force_initial_plan_request_complete(&self) {}
}
